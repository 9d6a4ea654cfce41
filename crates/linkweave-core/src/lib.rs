//! # linkweave-core
//!
//! Core types, traits, and abstractions for the linkweave internal-linking
//! recommender.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other linkweave crates depend on.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod progress;
pub mod rules;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EventBus, EventEnvelope, ServerEvent};
pub use models::*;
pub use progress::{Progress, ProgressCallback};
pub use rules::{LinkingRule, RuleTable, RulesDocument};
pub use traits::*;
