//! Axum route handlers for the async job API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::artifact_filename;
use crate::render::handlers::attachment_response;
use crate::render::{CacheStatus, RenderedDocument};
use crate::state::AppState;

use super::JobRecord;

fn status_body(job: &JobRecord) -> Value {
    json!({
        "job_id": job.id,
        "state": job.state,
        "created_at": job.created_at,
        "finished_at": job.finished_at,
        "result_ref": &job.result_ref,
        "error": &job.error,
    })
}

/// POST /generate/async
///
/// Enqueues the request and returns immediately with 202.
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(request): Json<crate::models::DocumentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let job = state.jobs.submit(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job_id": job.id, "state": job.state })),
    ))
}

/// GET /jobs/{id}
pub async fn handle_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let job = state
        .jobs
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(status_body(&job)))
}

/// GET /jobs/{id}/download
///
/// The artifact bytes for a successful job; 425 while pending/running, 404
/// otherwise.
pub async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let (job, bytes) = state.jobs.download(id).await?;
    let format = job.request.format;
    Ok(attachment_response(RenderedDocument {
        filename: artifact_filename(job.request.document_type, &job.request.data, format),
        bytes,
        content_type: format.content_type(),
        cache_status: CacheStatus::Bypass,
    }))
}

/// POST /jobs/{id}/cancel
///
/// Best-effort: transitions pending jobs to cancelled; running jobs finish
/// and have their result discarded.
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let job = state
        .jobs
        .cancel(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))?;
    Ok(Json(status_body(&job)))
}
