//! Persistent linking rules.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use linkweave_core::{defaults, Result, RuleTable};

/// JSON file holding the nested `{source: {target: {min_links, max_links}}}`
/// rules document.
#[derive(Debug, Clone)]
pub struct RulesFile {
    path: PathBuf,
}

impl RulesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `dir/segment_rules.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(defaults::RULES_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored rules, or `None` when no file has been saved yet.
    pub fn load(&self) -> Result<Option<RuleTable>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No rules file");
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path)?;
        RuleTable::from_json(&json).map(Some)
    }

    /// Persist `rules`, replacing any previous file.
    pub fn save(&self, rules: &RuleTable) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&rules.to_document())?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), rule_count = rules.len(), "Linking rules saved");
        Ok(())
    }
}
