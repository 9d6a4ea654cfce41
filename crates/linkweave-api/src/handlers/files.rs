//! Table uploads, template downloads and segment discovery.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use linkweave_jobs::{read_segments, sample_table, TableKind};

use super::blocking;
use crate::{ApiError, AppState};

/// `POST /upload/{content|links|performance}` with a multipart `file` field.
#[instrument(skip(state, multipart), fields(subsystem = "api", component = "files", op = "upload"))]
pub async fn upload(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let kind: TableKind = kind.parse()?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("{}.csv", kind));
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {}", e)))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }
    let (filename, bytes) = upload.ok_or_else(|| {
        ApiError::BadRequest("No file uploaded. Use field name 'file'.".to_string())
    })?;

    let uploads = state.uploads.clone();
    let stored = blocking(move || uploads.save(kind, &filename, &bytes)).await?;
    Ok(Json(stored))
}

#[derive(Debug, Deserialize)]
pub struct SegmentsQuery {
    pub content_file: String,
}

/// `GET /segments?content_file=<file_id>`: sorted distinct normalized
/// categories of an uploaded content table.
pub async fn segments(
    State(state): State<AppState>,
    Query(query): Query<SegmentsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let uploads = state.uploads.clone();
    let segments = blocking(move || {
        let path = uploads.resolve(&query.content_file)?;
        read_segments(&path)
    })
    .await?;
    Ok(Json(serde_json::json!({ "segments": segments })))
}

/// `GET /download-sample/{content|links|performance}`: a template table
/// carrying the expected headers and one example row.
pub async fn download_sample(Path(kind): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let kind: TableKind = kind.parse()?;
    let bytes = sample_table(kind)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"sample-{}.csv\"", kind),
            ),
        ],
        bytes,
    ))
}
