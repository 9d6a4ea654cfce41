//! # linkweave-api
//!
//! HTTP and WebSocket surface of linkweave: table uploads and templates,
//! linking rules, analysis jobs and result downloads.

pub mod error;
pub mod handlers;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use linkweave_core::defaults;
use linkweave_jobs::{AnalysisRunner, RulesFile, UploadStore};

pub use error::ApiError;

/// Listener and CORS settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<HeaderValue>,
}

impl ApiConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `HOST` | `0.0.0.0` | Bind address |
    /// | `PORT` | `8000` | Bind port |
    /// | `ALLOWED_ORIGINS` | `http://localhost:3000,http://localhost:8501` | CORS origin list |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults::SERVER_PORT);
        let allowed_origins =
            parse_allowed_origins(&std::env::var("ALLOWED_ORIGINS").unwrap_or_default());
        Self {
            host,
            port,
            allowed_origins,
        }
    }
}

/// Parse a comma-separated origin list. Entries that are not valid header
/// values are skipped; an empty list falls back to the local front-ends.
pub fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    let origins: Vec<HeaderValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| o.starts_with("http://") || o.starts_with("https://"))
        .filter_map(|o| o.parse().ok())
        .collect();
    if origins.is_empty() {
        vec![
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:8501"),
        ]
    } else {
        origins
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub runner: AnalysisRunner,
    pub uploads: UploadStore,
    pub rules: RulesFile,
    /// Active WebSocket connection count.
    pub ws_connections: Arc<AtomicUsize>,
}

impl AppState {
    /// State rooted at the runner's data directory.
    pub fn new(runner: AnalysisRunner) -> Self {
        let uploads = UploadStore::new(runner.config().uploads_dir());
        let rules = runner.config().rules_file();
        Self {
            runner,
            uploads,
            rules,
            ws_connections: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/upload/:kind", post(handlers::files::upload))
        .route("/download-sample/:kind", get(handlers::files::download_sample))
        .route("/segments", get(handlers::files::segments))
        .route(
            "/rules",
            get(handlers::rules::get_rules).post(handlers::rules::set_rules),
        )
        .route("/analyze", post(handlers::jobs::analyze))
        .route("/jobs", get(handlers::jobs::list_jobs))
        .route("/jobs/:id", get(handlers::jobs::get_job))
        .route("/jobs/:id/stop", post(handlers::jobs::stop_job))
        .route("/results/:id", get(handlers::jobs::download_results))
        .route("/ws/:id", get(handlers::ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .layer(DefaultBodyLimit::max(defaults::MAX_UPLOAD_BYTES))
        .layer(RequestBodyLimitLayer::new(defaults::MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_origins() {
        let origins = parse_allowed_origins("https://seo.example.com, http://localhost:9000 ,nope");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "https://seo.example.com");
        assert_eq!(origins[1], "http://localhost:9000");
    }

    #[test]
    fn test_parse_allowed_origins_defaults() {
        assert_eq!(parse_allowed_origins("").len(), 2);
        assert_eq!(parse_allowed_origins("*").len(), 2);
    }
}
