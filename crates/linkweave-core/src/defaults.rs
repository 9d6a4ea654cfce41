//! Centralized default constants for linkweave.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// ANALYSIS
// =============================================================================

/// Minimum cosine similarity for a candidate to be suggested.
pub const MIN_SIMILARITY: f32 = 0.2;

/// Number of anchor-text candidates requested per suggestion.
pub const ANCHOR_SUGGESTIONS: usize = 3;

/// Outbound suggestion cap per source page when no quota rule applies.
pub const DEFAULT_LINK_CAP: usize = 5;

/// Number of top keywords considered when building anchor candidates.
pub const ANCHOR_KEYWORD_POOL: usize = 10;

/// Tokens of this many characters or fewer never become anchor keywords.
pub const ANCHOR_MIN_TOKEN_CHARS: usize = 3;

/// Delimiter joining anchor candidates in the flat export.
pub const ANCHOR_DELIMITER: &str = " | ";

/// Category assigned when a page has no category at all.
pub const UNKNOWN_CATEGORY: &str = "unknown";

// =============================================================================
// BOOSTING
// =============================================================================

/// Clicks strictly above this value earn the click multiplier.
pub const BOOST_CLICK_THRESHOLD: u64 = 10;

/// Multiplier applied for well-clicked targets.
pub const BOOST_CLICK_MULTIPLIER: f32 = 1.3;

/// Average positions strictly below this value earn the position multiplier.
pub const BOOST_POSITION_THRESHOLD: f64 = 10.0;

/// Multiplier applied for well-ranked targets.
pub const BOOST_POSITION_MULTIPLIER: f32 = 1.2;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Texts per embedding request. Bounds peak memory, not a user setting.
pub const EMBED_BATCH_SIZE: usize = 32;

/// Default multilingual sentence-embedding model (Ollama).
pub const EMBED_MODEL: &str = "paraphrase-multilingual";

/// Embedding dimension of the default model.
pub const EMBED_DIMENSION: usize = 768;

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 60;

/// Embedding batches slower than this are logged as slow.
pub const EMBED_SLOW_MS: u64 = 5_000;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 8000;

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Maximum upload size in bytes (64 MB).
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// File name of the persisted linking rules, relative to the data directory.
pub const RULES_FILE_NAME: &str = "segment_rules.json";

/// Prefix of result artifact file names.
pub const RESULT_FILE_PREFIX: &str = "linkweave_suggestions";
