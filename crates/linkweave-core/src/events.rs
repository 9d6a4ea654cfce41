//! Job event types, envelope schema, and event bus for real-time notifications.
//!
//! The job store publishes every job state change here. Downstream consumers
//! (the WebSocket endpoint, tests) subscribe independently.
//!
//! ## Envelope Schema
//!
//! Every emission is an [`EventEnvelope`]: a versioned wrapper carrying an
//! event id, a timestamp and the entity scope, with the domain-specific
//! [`ServerEvent`] in `payload`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

// ============================================================================
// Event Envelope
// ============================================================================

/// Versioned server event envelope.
///
/// `event_type` uses dot-namespaced names (`"job.started"`,
/// `"job.progress"`). Consumers should ignore unknown fields.
///
/// ## Wire Format (WebSocket text frame)
///
/// ```text
/// {"event_id":"...","event_type":"job.progress","occurred_at":"...","entity_type":"job","entity_id":"...","payload_version":1,"payload":{...}}
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type.
    pub event_type: String,
    /// When the event occurred (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Type of entity this event relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// ID of the entity this event relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Payload schema version.
    pub payload_version: u32,
    /// Domain-specific event data.
    pub payload: ServerEvent,
}

impl EventEnvelope {
    /// Wrap a ServerEvent with fresh metadata.
    pub fn new(event: ServerEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.namespaced_event_type().to_string(),
            occurred_at: Utc::now(),
            entity_type: event.entity_type().map(String::from),
            entity_id: Some(event.job_id().to_string()),
            payload_version: 1,
            payload: event,
        }
    }

    /// Job this envelope concerns.
    pub fn job_id(&self) -> Uuid {
        self.payload.job_id()
    }
}

// ============================================================================
// Server Event (domain payloads)
// ============================================================================

/// Job lifecycle events.
///
/// Serialized as JSON with a `type` tag field, e.g.:
/// `{"type":"JobProgress","job_id":"...","progress":40,"message":"Embedding"}`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// An analysis job was accepted.
    JobQueued { job_id: Uuid },
    /// The background task picked the job up.
    JobStarted { job_id: Uuid },
    /// Progress checkpoint reached.
    JobProgress {
        job_id: Uuid,
        progress: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The job finished and its artifact is available.
    JobCompleted {
        job_id: Uuid,
        result_file: String,
        suggestion_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<i64>,
    },
    /// The job failed.
    JobFailed { job_id: Uuid, error: String },
    /// The job was stopped on request.
    JobStopped { job_id: Uuid },
}

impl ServerEvent {
    /// Returns the short event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::JobQueued { .. } => "JobQueued",
            ServerEvent::JobStarted { .. } => "JobStarted",
            ServerEvent::JobProgress { .. } => "JobProgress",
            ServerEvent::JobCompleted { .. } => "JobCompleted",
            ServerEvent::JobFailed { .. } => "JobFailed",
            ServerEvent::JobStopped { .. } => "JobStopped",
        }
    }

    /// Returns the namespaced event type for the envelope.
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            ServerEvent::JobQueued { .. } => "job.queued",
            ServerEvent::JobStarted { .. } => "job.started",
            ServerEvent::JobProgress { .. } => "job.progress",
            ServerEvent::JobCompleted { .. } => "job.completed",
            ServerEvent::JobFailed { .. } => "job.failed",
            ServerEvent::JobStopped { .. } => "job.stopped",
        }
    }

    /// Returns the entity type this event relates to.
    pub fn entity_type(&self) -> Option<&'static str> {
        Some("job")
    }

    /// Job this event concerns.
    pub fn job_id(&self) -> Uuid {
        match self {
            ServerEvent::JobQueued { job_id }
            | ServerEvent::JobStarted { job_id }
            | ServerEvent::JobProgress { job_id, .. }
            | ServerEvent::JobCompleted { job_id, .. }
            | ServerEvent::JobFailed { job_id, .. }
            | ServerEvent::JobStopped { job_id } => *job_id,
        }
    }

    /// Whether no further events follow for this job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServerEvent::JobCompleted { .. }
                | ServerEvent::JobFailed { .. }
                | ServerEvent::JobStopped { .. }
        )
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast-based event bus for distributing job events to multiple consumers.
///
/// Uses `tokio::sync::broadcast` with a configurable buffer size. Slow
/// receivers that fall behind get a `Lagged` error and miss events.
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    ///
    /// Recommended: 256 for production, 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently with no subscribers.
    pub fn emit(&self, event: ServerEvent) {
        let envelope = EventEnvelope::new(event);
        let subscriber_count = self.tx.receiver_count();
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count,
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive enveloped events. Each subscriber gets its own independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

// ============================================================================
// Tests
// ============================================================================
