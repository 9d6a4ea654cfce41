//! HTTP handlers for linkweave-api.

pub mod files;
pub mod jobs;
pub mod rules;
pub mod ws;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::{ApiError, AppState};

/// Run filesystem work on the blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> linkweave_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| {
            ApiError::Internal(linkweave_core::Error::Internal(format!(
                "blocking task failed: {}",
                e
            )))
        })?
        .map_err(ApiError::from)
}

/// Liveness plus embedding backend reachability. Always 200; an
/// unreachable backend reports `"degraded"`.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.runner.backend();
    let reachable = match backend.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            tracing::debug!(error = %e, "Embedding backend health check failed");
            false
        }
    };
    Json(serde_json::json!({
        "status": if reachable { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "embedding": {
            "model": backend.model_name(),
            "dimension": backend.dimension(),
            "reachable": reachable,
        },
        "active_jobs": state.runner.active_count(),
    }))
}
