//! Core data models for linkweave.
//!
//! These types are shared across all linkweave crates: the raw input rows
//! handed to the engine, the normalized working set, the suggestions it
//! produces, and the job records tracked by the runner.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::rules::RuleTable;

/// Dense embedding vector.
pub type Vector = Vec<f32>;

// =============================================================================
// CATEGORY
// =============================================================================

/// Normalized page classification.
///
/// The three known categories drive the default linking rules; anything else
/// is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Blog,
    Categorie,
    Produit,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Blog => "blog",
            Category::Categorie => "categorie",
            Category::Produit => "produit",
            Category::Other(s) => s,
        }
    }

    /// Category used when a page has no category at all.
    pub fn unknown() -> Self {
        Category::Other(defaults::UNKNOWN_CATEGORY.to_string())
    }

    /// Map an already-normalized label onto a category. Only exact
    /// (trimmed, case-insensitive) names select the known variants.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "blog" => Category::Blog,
            "categorie" => Category::Categorie,
            "produit" => Category::Produit,
            "" => Category::unknown(),
            _ => Category::Other(label),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::from_label(&s)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Category::from_label(s)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

// =============================================================================
// RAW INPUT
// =============================================================================

/// One row of the content table, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPageRecord {
    pub url: Option<String>,
    pub category: Option<String>,
    pub content_primary: Option<String>,
    pub content_secondary: Option<String>,
}

/// One row of the existing-links table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    pub source_url: String,
    pub destination_url: String,
}

/// One row of the search-performance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPerformanceRow {
    pub url: String,
    pub clicks: u64,
    pub impressions: u64,
    pub position: f64,
}

/// Everything one `analyze` call works on.
///
/// Empty `links` or `performance` means the table was not supplied.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub pages: Vec<RawPageRecord>,
    pub links: Vec<RawLink>,
    pub performance: Vec<RawPerformanceRow>,
}

// =============================================================================
// WORKING SET
// =============================================================================

/// A normalized page in the working set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Canonical URL.
    pub url: String,
    pub category: Category,
    /// Never empty for pages in the working set.
    pub cleaned_text: String,
    /// Row/column of this page in the similarity matrix.
    pub raw_index: usize,
    /// Row of the content table this page came from.
    pub input_row: usize,
}

/// Existing directed links, indexed by canonical source URL.
#[derive(Debug, Clone, Default)]
pub struct ExistingLinks {
    by_source: HashMap<String, HashSet<String>>,
}

impl ExistingLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `source -> destination`. Both must already be canonical.
    pub fn insert(&mut self, source: String, destination: String) {
        self.by_source.entry(source).or_default().insert(destination);
    }

    pub fn contains(&self, source: &str, destination: &str) -> bool {
        self.by_source
            .get(source)
            .is_some_and(|dests| dests.contains(destination))
    }

    /// Number of distinct directed pairs.
    pub fn len(&self) -> usize {
        self.by_source.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

/// Search-performance signals for one canonical URL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub clicks: u64,
    pub impressions: u64,
    /// Average search position (1 is best).
    pub position: f64,
}

/// Performance metrics keyed by canonical URL.
#[derive(Debug, Clone, Default)]
pub struct PerformanceTable {
    by_url: HashMap<String, PerformanceMetric>,
}

impl PerformanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later rows for the same URL replace earlier ones.
    pub fn insert(&mut self, url: String, metric: PerformanceMetric) {
        self.by_url.insert(url, metric);
    }

    pub fn get(&self, url: &str) -> Option<&PerformanceMetric> {
        self.by_url.get(url)
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

/// One proposed internal link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub source_url: String,
    pub source_category: Category,
    pub target_url: String,
    pub target_category: Category,
    /// Raw cosine similarity.
    pub similarity_score: f32,
    /// Similarity after performance boosting.
    pub final_score: f32,
    pub anchor_candidates: Vec<String>,
}

impl Suggestion {
    /// Anchor candidates in the flat export form.
    pub fn joined_anchors(&self) -> String {
        self.anchor_candidates.join(defaults::ANCHOR_DELIMITER)
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Closed stopword list used by the anchor miner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopwordLanguage {
    #[default]
    French,
    English,
}

/// Per-run analysis parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Candidates scoring below this cosine similarity are dropped.
    pub min_similarity: f32,
    /// Maximum anchor candidates per suggestion.
    pub anchor_suggestions: usize,
    pub stopword_language: StopwordLanguage,
    /// Outbound cap per source when no quota rule applies.
    pub default_link_cap: usize,
    /// Quota rules; `None` means the unconstrained path for every page.
    #[serde(skip)]
    pub linking_rules: Option<RuleTable>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_similarity: defaults::MIN_SIMILARITY,
            anchor_suggestions: defaults::ANCHOR_SUGGESTIONS,
            stopword_language: StopwordLanguage::default(),
            default_link_cap: defaults::DEFAULT_LINK_CAP,
            linking_rules: None,
        }
    }
}

impl AnalysisConfig {
    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.linking_rules = Some(rules);
        self
    }

    /// Reject parameters no analysis could honour.
    pub fn validate(&self) -> Result<()> {
        if !self.min_similarity.is_finite() || !(-1.0..=1.0).contains(&self.min_similarity) {
            return Err(Error::Config(format!(
                "min_similarity must be within [-1, 1], got {}",
                self.min_similarity
            )));
        }
        Ok(())
    }
}

// =============================================================================
// JOB TYPES
// =============================================================================

/// Lifecycle state of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    /// Whether the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }
}

/// Snapshot of one analysis job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub status: JobStatus,
    /// Percent complete, 0–100.
    pub progress: u8,
    pub message: String,
    pub result_file: Option<String>,
    pub suggestion_count: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued".to_string(),
            result_file: None,
            suggestion_count: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }
}
