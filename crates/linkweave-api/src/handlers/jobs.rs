//! Analysis job endpoints.

use std::path::Path as FsPath;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use linkweave_core::{AnalysisConfig, JobStatus, StopwordLanguage};
use linkweave_jobs::InputFiles;

use crate::{ApiError, AppState};

/// Analysis parameters a request may override. The per-source link cap is
/// a deployment setting and is not exposed here.
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisParams {
    pub min_similarity: Option<f32>,
    pub anchor_suggestions: Option<usize>,
    pub stopword_language: Option<StopwordLanguage>,
}

impl AnalysisParams {
    pub fn into_config(self, default_link_cap: usize) -> AnalysisConfig {
        let base = AnalysisConfig {
            default_link_cap,
            ..AnalysisConfig::default()
        };
        AnalysisConfig {
            min_similarity: self.min_similarity.unwrap_or(base.min_similarity),
            anchor_suggestions: self.anchor_suggestions.unwrap_or(base.anchor_suggestions),
            stopword_language: self.stopword_language.unwrap_or(base.stopword_language),
            ..base
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub content_file: String,
    pub links_file: Option<String>,
    pub performance_file: Option<String>,
    #[serde(default)]
    pub config: AnalysisParams,
}

/// Queue an analysis over previously uploaded tables.
#[instrument(skip(state, request), fields(subsystem = "api", component = "jobs", op = "analyze"))]
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resolve_optional = |id: Option<&str>| -> Result<_, ApiError> {
        match id.filter(|s| !s.is_empty()) {
            Some(id) => Ok(Some(state.uploads.resolve(id)?)),
            None => Ok(None),
        }
    };
    let files = InputFiles {
        content: state.uploads.resolve(&request.content_file)?,
        links: resolve_optional(request.links_file.as_deref())?,
        performance: resolve_optional(request.performance_file.as_deref())?,
    };
    let config = request
        .config
        .into_config(state.runner.config().default_link_cap);

    let job_id = state.runner.submit(files, config)?;
    Ok(Json(serde_json::json!({ "job_id": job_id })))
}

pub async fn list_jobs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.runner.store().list()?))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.runner.store().get(id)?))
}

pub async fn stop_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.runner.stop(id)?))
}

/// CSV download of a completed job's suggestions.
pub async fn download_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.runner.store().get(id)?;
    if job.status != JobStatus::Completed {
        return Err(ApiError::BadRequest(format!(
            "Analysis {} is not completed yet",
            id
        )));
    }
    let result_file = job
        .result_file
        .ok_or_else(|| ApiError::NotFound(format!("Result file of job {}", id)))?;

    let bytes = match tokio::fs::read(&result_file).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("Result file of job {}", id)));
        }
        Err(e) => return Err(linkweave_core::Error::from(e).into()),
    };
    let filename = FsPath::new(&result_file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("linkweave_suggestions.csv")
        .to_string();

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_override_defaults() {
        let params: AnalysisParams =
            serde_json::from_str(r#"{"min_similarity":0.35,"stopword_language":"english"}"#)
                .unwrap();
        let config = params.into_config(8);
        assert!((config.min_similarity - 0.35).abs() < 1e-6);
        assert_eq!(config.anchor_suggestions, 3);
        assert_eq!(config.stopword_language, StopwordLanguage::English);
        assert_eq!(config.default_link_cap, 8);
        assert!(config.linking_rules.is_none());
    }

    #[test]
    fn test_analyze_request_config_optional() {
        let request: AnalyzeRequest =
            serde_json::from_str(r#"{"content_file":"content_00000000000000000000000000000000"}"#)
                .unwrap();
        assert!(request.links_file.is_none());
        assert!(request.config.min_similarity.is_none());
    }
}
