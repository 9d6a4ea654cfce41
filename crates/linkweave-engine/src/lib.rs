//! # linkweave-engine
//!
//! Internal-link recommendation pipeline for linkweave.
//!
//! Stages, each consuming the previous stage's output:
//! - [`preprocess`]: URL/category normalization, text cleaning, working set
//! - [`embedder`]: batched sentence embeddings
//! - [`similarity`]: dense cosine-similarity matrix
//! - [`allocator`]: rule-constrained target selection
//! - [`anchors`]: anchor-text mining
//! - [`boost`]: performance-based score boosting
//! - [`assemble`]: final ordering
//!
//! [`LinkEngine`] drives the whole pipeline; [`export`] writes the result
//! artifact.

pub mod allocator;
pub mod anchors;
pub mod assemble;
pub mod boost;
pub mod embedder;
pub mod engine;
pub mod export;
pub mod preprocess;
pub mod similarity;
pub mod stopwords;

pub use allocator::{Candidate, LinkAllocator};
pub use anchors::AnchorMiner;
pub use boost::BoostPolicy;
pub use embedder::Embedder;
pub use engine::LinkEngine;
pub use similarity::SimilarityMatrix;
pub use stopwords::StopWordsFilter;
