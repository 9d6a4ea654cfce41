use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkweave_core::EventBus;
use linkweave_inference::{EmbeddingBackend, OllamaBackend};
use linkweave_jobs::{AnalysisRunner, JobStore, RunnerConfig};

use linkweave_api::{router, ApiConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "linkweave=info,tower_http=info")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "linkweave_api=info,linkweave_jobs=info,linkweave_engine=info,linkweave_inference=info,tower_http=info"
            .into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("linkweave-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let api_config = ApiConfig::from_env();
    let runner_config = RunnerConfig::from_env();
    std::fs::create_dir_all(runner_config.uploads_dir())?;
    std::fs::create_dir_all(runner_config.results_dir())?;

    let backend = OllamaBackend::from_env()?;
    info!(
        base_url = backend.base_url(),
        model = backend.model_name(),
        dimension = backend.dimension(),
        "Embedding backend configured"
    );
    match backend.health_check().await {
        Ok(true) => info!("Embedding backend reachable"),
        Ok(false) | Err(_) => warn!("Embedding backend unreachable; analyses will fail until it is up"),
    }

    let store = JobStore::new(Arc::new(EventBus::default()));
    let runner = AnalysisRunner::new(Arc::new(backend), store, runner_config.clone());
    let state = AppState::new(runner);
    let app = router(state, api_config.allowed_origins.clone());

    let addr: SocketAddr = format!("{}:{}", api_config.host, api_config.port).parse()?;
    info!(
        data_dir = %runner_config.data_dir.display(),
        default_link_cap = runner_config.default_link_cap,
        "Starting server on {}",
        addr
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
