//! # linkweave-inference
//!
//! Sentence-embedding backends for linkweave.
//!
//! This crate provides:
//! - Ollama implementation of [`EmbeddingBackend`] (default)
//! - Deterministic mock backend for tests (feature `mock`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `mock`: Enable the mock backend outside this crate's own tests
//!
//! # Example
//!
//! ```rust,no_run
//! use linkweave_inference::OllamaBackend;
//! use linkweave_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env().unwrap();
//!     let texts = vec!["chaussures de trail".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await.unwrap();
//! }
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use linkweave_core::{EmbeddingBackend, Error, Result, Vector};

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEmbeddingBackend, MockEmbeddingGenerator};
