//! Uploaded table storage.
//!
//! Uploaded files are addressed by an opaque `file_id` of the form
//! `<kind>_<32 hex>`; callers never pass filesystem paths.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use linkweave_core::{Error, Result};

use crate::input::{validate_columns, TableKind};

/// Receipt for an accepted upload.
#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub filename: String,
    pub file_id: String,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` and validate the table's columns. The file is removed
    /// again when validation fails.
    pub fn save(&self, kind: TableKind, filename: &str, bytes: &[u8]) -> Result<StoredUpload> {
        std::fs::create_dir_all(&self.dir)?;
        let file_id = format!("{}_{}", kind.as_str(), Uuid::new_v4().simple());
        let path = self.path_for(&file_id);
        std::fs::write(&path, bytes)?;

        if let Err(e) = validate_columns(&path, kind) {
            if let Err(remove_err) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %remove_err, "Failed to remove rejected upload");
            }
            return Err(e);
        }

        info!(file_id = %file_id, table = %kind, size_bytes = bytes.len(), "Upload stored");
        Ok(StoredUpload {
            filename: filename.to_string(),
            file_id,
            path,
        })
    }

    /// Path of a previously stored upload.
    pub fn resolve(&self, file_id: &str) -> Result<PathBuf> {
        if !is_valid_file_id(file_id) {
            return Err(Error::InvalidInput(format!("malformed file id: {}", file_id)));
        }
        let path = self.path_for(file_id);
        if !path.is_file() {
            return Err(Error::NotFound(format!("upload {}", file_id)));
        }
        Ok(path)
    }

    fn path_for(&self, file_id: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", file_id))
    }
}

fn is_valid_file_id(file_id: &str) -> bool {
    let Some((kind, hex)) = file_id.split_once('_') else {
        return false;
    };
    kind.parse::<TableKind>().is_ok()
        && kind.chars().all(|c| c.is_ascii_lowercase())
        && hex.len() == 32
        && hex.chars().all(|c| c.is_ascii_hexdigit())
}
