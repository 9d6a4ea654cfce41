//! # linkweave-jobs
//!
//! Everything between an uploaded table and a finished result file:
//! - CSV loading and column validation for the three input tables
//! - upload storage addressed by opaque file ids
//! - persistent linking rules
//! - the in-memory job registry, publishing every state change
//! - the background runner executing analyses on tokio tasks
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use linkweave_jobs::{AnalysisRunner, InputFiles, JobStore, RunnerConfig};
//!
//! let store = JobStore::default();
//! let runner = AnalysisRunner::new(backend, store.clone(), RunnerConfig::from_env());
//! let mut events = store.subscribe();
//! let job_id = runner.submit(InputFiles::content_only("content.csv"), Default::default())?;
//! while let Ok(event) = events.recv().await {
//!     println!("{}: {}", event.event_type, event.job_id());
//! }
//! ```

pub mod input;
pub mod rules_file;
pub mod runner;
pub mod store;
pub mod uploads;

pub use input::{
    load_input, read_segments, sample_table, validate_columns, InputFiles, TableKind,
};
pub use rules_file::RulesFile;
pub use runner::{AnalysisRunner, RunnerConfig};
pub use store::JobStore;
pub use uploads::{StoredUpload, UploadStore};
