//! Background execution of analysis jobs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::task::AbortHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use linkweave_core::{
    defaults, AnalysisConfig, EmbeddingBackend, Error, JobRecord, Progress, Result, Suggestion,
};
use linkweave_engine::export::write_result_file;
use linkweave_engine::LinkEngine;

use crate::input::{load_input, InputFiles};
use crate::rules_file::RulesFile;
use crate::store::JobStore;

/// Where the runner reads rules from and writes results to.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub data_dir: PathBuf,
    pub default_link_cap: usize,
}

impl RunnerConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            default_link_cap: defaults::DEFAULT_LINK_CAP,
        }
    }

    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LINKWEAVE_DATA_DIR` | `.` | Holds `uploads/`, `results/` and the rules file |
    /// | `LINKWEAVE_DEFAULT_LINK_CAP` | `5` | Per-source cap when no rule applies |
    pub fn from_env() -> Self {
        let data_dir = std::env::var("LINKWEAVE_DATA_DIR").unwrap_or_else(|_| ".".to_string());
        let default_link_cap = std::env::var("LINKWEAVE_DEFAULT_LINK_CAP")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::DEFAULT_LINK_CAP);
        Self {
            data_dir: PathBuf::from(data_dir),
            default_link_cap,
        }
    }

    pub fn with_default_link_cap(mut self, cap: usize) -> Self {
        self.default_link_cap = cap;
        self
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.data_dir.join("results")
    }

    pub fn rules_file(&self) -> RulesFile {
        RulesFile::in_dir(&self.data_dir)
    }
}

/// Spawns one tokio task per submitted analysis and tracks it until it
/// finishes or is stopped.
///
/// A fresh [`LinkEngine`] is built per job, so an embedding backend that
/// is down fails that job rather than the server.
#[derive(Clone)]
pub struct AnalysisRunner {
    backend: Arc<dyn EmbeddingBackend>,
    store: JobStore,
    config: RunnerConfig,
    tasks: Arc<Mutex<HashMap<Uuid, AbortHandle>>>,
}

impl AnalysisRunner {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, store: JobStore, config: RunnerConfig) -> Self {
        Self {
            backend,
            store,
            config,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn EmbeddingBackend> {
        &self.backend
    }

    /// Number of jobs whose task has not finished yet.
    pub fn active_count(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Queue an analysis. Invalid parameters are rejected before a job is
    /// created.
    pub fn submit(&self, files: InputFiles, config: AnalysisConfig) -> Result<Uuid> {
        config.validate()?;
        let job = self.store.create()?;
        let job_id = job.id;

        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| Error::Internal("runner task table poisoned".into()))?;
        let runner = self.clone();
        let handle = tokio::spawn(async move {
            runner.run(job_id, files, config).await;
        });
        tasks.insert(job_id, handle.abort_handle());
        info!(job_id = %job_id, "Analysis queued");
        Ok(job_id)
    }

    /// Stop a queued or running job. Its task is aborted and no result is
    /// recorded; an artifact already being written is removed once the
    /// writer finishes.
    pub fn stop(&self, job_id: Uuid) -> Result<JobRecord> {
        let record = self.store.stop(job_id)?;
        let handle = self
            .tasks
            .lock()
            .map_err(|_| Error::Internal("runner task table poisoned".into()))?
            .remove(&job_id);
        if let Some(handle) = handle {
            handle.abort();
        }
        Ok(record)
    }

    #[instrument(skip(self, files, config), fields(subsystem = "jobs", component = "runner", op = "run", job_id = %job_id))]
    async fn run(&self, job_id: Uuid, files: InputFiles, config: AnalysisConfig) {
        let start = Instant::now();
        match self.store.mark_running(job_id) {
            Ok(true) => {}
            Ok(false) => {
                self.forget(job_id);
                return;
            }
            Err(e) => {
                error!(error = %e, "Could not start job");
                self.forget(job_id);
                return;
            }
        }

        match self.execute(job_id, files, config).await {
            Ok(Some(path)) => {
                info!(
                    result_file = %path.display(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Analysis finished"
                );
            }
            Ok(None) => info!("Job stopped before its result was recorded"),
            Err(e) => {
                error!(error = %e, "Analysis failed");
                if let Err(store_err) = self.store.fail(job_id, e.to_string()) {
                    error!(error = %store_err, "Could not record failure");
                }
            }
        }
        self.forget(job_id);
    }

    async fn execute(
        &self,
        job_id: Uuid,
        files: InputFiles,
        mut config: AnalysisConfig,
    ) -> Result<Option<PathBuf>> {
        let rules_file = self.config.rules_file();
        let (input, rules) = tokio::task::spawn_blocking(move || -> Result<_> {
            Ok((load_input(&files)?, rules_file.load()?))
        })
        .await
        .map_err(|e| Error::Internal(format!("input loader panicked: {}", e)))??;
        if let Some(rules) = rules {
            config = config.with_rules(rules);
        }

        let engine = LinkEngine::new(self.backend.clone()).await?;
        let store = self.store.clone();
        let progress = Progress::new(move |description, current, total| {
            if let Err(e) = store.update_progress(job_id, description, current, total) {
                warn!(job_id = %job_id, error = %e, "Progress update dropped");
            }
        });
        let suggestions = engine.analyze(input, &config, &progress).await?;

        let dir = self.config.results_dir();
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || commit_result(&store, &dir, job_id, &suggestions))
            .await
            .map_err(|e| Error::Internal(format!("result writer panicked: {}", e)))?
    }

    fn forget(&self, job_id: Uuid) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.remove(&job_id);
        }
    }
}

/// Write the artifact and record completion.
///
/// Runs on the blocking pool, which keeps going after the job's task is
/// aborted. A job stopped before completion is recorded gets its artifact
/// removed here and yields `None`.
fn commit_result(
    store: &JobStore,
    dir: &Path,
    job_id: Uuid,
    suggestions: &[Suggestion],
) -> Result<Option<PathBuf>> {
    let path = write_result_file(dir, job_id, suggestions)?;
    match store.complete(job_id, path.display().to_string(), suggestions.len()) {
        Ok(true) => Ok(Some(path)),
        Ok(false) => {
            discard(&path);
            Ok(None)
        }
        Err(e) => {
            discard(&path);
            Err(e)
        }
    }
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "Failed to remove result of stopped job");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkweave_core::JobStatus;

    fn running_job(store: &JobStore) -> Uuid {
        let job = store.create().unwrap();
        assert!(store.mark_running(job.id).unwrap());
        job.id
    }

    #[test]
    fn test_commit_records_completion() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::default();
        let job_id = running_job(&store);

        let path = commit_result(&store, dir.path(), job_id, &[]).unwrap().unwrap();
        assert!(path.is_file());
        let job = store.get(job_id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result_file, Some(path.display().to_string()));
        assert_eq!(job.suggestion_count, Some(0));
    }

    #[test]
    fn test_commit_after_stop_removes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        let store = JobStore::default();
        let job_id = running_job(&store);
        store.stop(job_id).unwrap();

        let committed = commit_result(&store, &results, job_id, &[]).unwrap();
        assert!(committed.is_none());
        assert_eq!(std::fs::read_dir(&results).unwrap().count(), 0);
        let job = store.get(job_id).unwrap();
        assert_eq!(job.status, JobStatus::Stopped);
        assert!(job.result_file.is_none());
    }

    #[test]
    fn test_commit_for_unknown_job_removes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::default();
        let err = commit_result(&store, dir.path(), Uuid::new_v4(), &[]).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
