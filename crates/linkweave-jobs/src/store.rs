//! In-memory job registry with event fan-out.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use linkweave_core::progress::percent;
use linkweave_core::{Error, EventBus, EventEnvelope, JobRecord, JobStatus, Result, ServerEvent};

/// Registry of analysis jobs.
///
/// Every state change is published on the [`EventBus`]. Terminal jobs
/// never change again: late progress or completion for a stopped job is
/// ignored and reported back as `false`.
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
    events: Arc<EventBus>,
}

impl JobStore {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Subscribe to every job event.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Register a new queued job.
    pub fn create(&self) -> Result<JobRecord> {
        let record = JobRecord::new(Uuid::new_v4());
        {
            let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
            jobs.insert(record.id, record.clone());
            self.events.emit(ServerEvent::JobQueued { job_id: record.id });
        }
        debug!(job_id = %record.id, "Job created");
        Ok(record)
    }

    pub fn get(&self, id: Uuid) -> Result<JobRecord> {
        self.jobs
            .read()
            .map_err(|_| poisoned())?
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("job {}", id)))
    }

    /// All jobs, newest first.
    pub fn list(&self) -> Result<Vec<JobRecord>> {
        let mut jobs: Vec<JobRecord> = self
            .jobs
            .read()
            .map_err(|_| poisoned())?
            .values()
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    pub fn mark_running(&self, id: Uuid) -> Result<bool> {
        self.transition(id, |job| {
            if job.status != JobStatus::Queued {
                return None;
            }
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
            job.message = "Running".to_string();
            Some(ServerEvent::JobStarted { job_id: job.id })
        })
    }

    /// Record a checkpoint. Percent is `current * 100 / total`, 0 when
    /// `total == 0`.
    pub fn update_progress(
        &self,
        id: Uuid,
        description: &str,
        current: usize,
        total: usize,
    ) -> Result<bool> {
        let progress = percent(current, total);
        self.transition(id, |job| {
            if job.status != JobStatus::Running {
                return None;
            }
            job.progress = progress;
            job.message = description.to_string();
            Some(ServerEvent::JobProgress {
                job_id: job.id,
                progress,
                message: Some(description.to_string()),
            })
        })
    }

    pub fn complete(&self, id: Uuid, result_file: String, suggestion_count: usize) -> Result<bool> {
        let applied = self.transition(id, |job| {
            if job.status.is_terminal() {
                return None;
            }
            let now = Utc::now();
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.message = "Analysis complete".to_string();
            job.result_file = Some(result_file.clone());
            job.suggestion_count = Some(suggestion_count);
            job.finished_at = Some(now);
            Some(ServerEvent::JobCompleted {
                job_id: job.id,
                result_file: result_file.clone(),
                suggestion_count,
                duration_ms: job.started_at.map(|s| (now - s).num_milliseconds()),
            })
        })?;
        if applied {
            info!(job_id = %id, suggestion_count, result_file = %result_file, "Job completed");
        }
        Ok(applied)
    }

    pub fn fail(&self, id: Uuid, error: String) -> Result<bool> {
        let applied = self.transition(id, |job| {
            if job.status.is_terminal() {
                return None;
            }
            job.status = JobStatus::Failed;
            job.message = "Analysis failed".to_string();
            job.error = Some(error.clone());
            job.finished_at = Some(Utc::now());
            Some(ServerEvent::JobFailed {
                job_id: job.id,
                error: error.clone(),
            })
        })?;
        if applied {
            warn!(job_id = %id, error = %error, "Job failed");
        }
        Ok(applied)
    }

    /// Mark a job stopped. Stopping a finished job is a [`Error::Job`].
    pub fn stop(&self, id: Uuid) -> Result<JobRecord> {
        let mut snapshot = None;
        let applied = self.transition(id, |job| {
            if job.status.is_terminal() {
                snapshot = Some(job.clone());
                return None;
            }
            job.status = JobStatus::Stopped;
            job.message = "Analysis stopped".to_string();
            job.finished_at = Some(Utc::now());
            snapshot = Some(job.clone());
            Some(ServerEvent::JobStopped { job_id: job.id })
        })?;
        let record = snapshot.ok_or_else(|| Error::NotFound(format!("job {}", id)))?;
        if !applied {
            return Err(Error::Job(format!(
                "job {} already finished ({})",
                id,
                serde_json::to_string(&record.status)?.trim_matches('"')
            )));
        }
        info!(job_id = %id, "Job stopped");
        Ok(record)
    }

    /// Apply `change` and publish its event under the write lock, so events
    /// of one job go out in the order their changes were applied. Returns
    /// whether the change was applied.
    fn transition<F>(&self, id: Uuid, change: F) -> Result<bool>
    where
        F: FnOnce(&mut JobRecord) -> Option<ServerEvent>,
    {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        let job = jobs
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;
        match change(job) {
            Some(event) => {
                // broadcast::send never blocks
                self.events.emit(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::default()))
    }
}

fn poisoned() -> Error {
    Error::Internal("job store lock poisoned".into())
}
