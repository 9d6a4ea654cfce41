//! Structured logging schema and field name constants for linkweave.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Run aborted, requires operator attention |
//! | WARN  | Recoverable issue, fallback applied (dropped rows, slow batch) |
//! | INFO  | Lifecycle events (startup, job start/finish, analysis complete) |
//! | DEBUG | Decision points, stage sizes, config choices |
//! | TRACE | Per-page iteration, per-candidate decisions |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "engine", "inference", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "preprocess", "embedder", "allocator", "ollama", "runner"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "analyze", "embed_texts", "allocate"
pub const OPERATION: &str = "op";

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of pages in the working set.
pub const PAGE_COUNT: &str = "page_count";

/// Number of input texts sent to an embedding model.
pub const INPUT_COUNT: &str = "input_count";

/// Number of suggestions produced.
pub const SUGGESTION_COUNT: &str = "suggestion_count";

/// Number of rows dropped during preprocessing.
pub const DROPPED_COUNT: &str = "dropped_count";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for embeddings.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
