//! Job routes
//!
//! - `POST /url` queue a URL
//! - `GET /url/:id` read a job's status
//! - `DELETE /url/:id` abort a running job

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::commands::{
    abort::handle as handle_abort, enqueue::handle as handle_enqueue, AbortJobCommand,
    AbortJobError, EnqueueUrlCommand, EnqueueUrlError,
};
use super::queries::{get_status::handle as handle_get_status, GetJobStatusError, GetJobStatusQuery};
use crate::error::AppError;
use crate::ingest::framework::JobService;

/// Create job routes
pub fn jobs_routes() -> Router<Arc<dyn JobService>> {
    Router::new()
        .route("/url", post(enqueue_url))
        .route("/url/:id", get(get_status).delete(abort_job))
}

/// `{"id", "error"}` body used for unknown jobs
fn job_not_found(id: Uuid, error: impl std::fmt::Display) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "id": id, "error": error.to_string() })),
    )
        .into_response()
}

fn job_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Queue a URL for ingestion
///
/// POST /url
async fn enqueue_url(
    State(jobs): State<Arc<dyn JobService>>,
    payload: Result<Json<EnqueueUrlCommand>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(command) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    match handle_enqueue(jobs.as_ref(), command).await {
        Ok(job) => Ok((StatusCode::ACCEPTED, Json(job)).into_response()),
        Err(EnqueueUrlError::Validation(e)) => Err(AppError::Validation(e.to_string())),
        Err(EnqueueUrlError::Scheduler(e)) => Err(e.into()),
    }
}

/// Read a job's status
///
/// GET /url/:id
async fn get_status(
    State(jobs): State<Arc<dyn JobService>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = job_id(path)?;

    match handle_get_status(jobs.as_ref(), GetJobStatusQuery { id }).await {
        Ok(status) => Ok((StatusCode::OK, Json(status)).into_response()),
        Err(e @ GetJobStatusError::NotFound) => {
            tracing::debug!(job_id = %id, "Status not found");
            Ok(job_not_found(id, e))
        }
        Err(GetJobStatusError::Scheduler(e)) => Err(e.into()),
    }
}

/// Abort a running job
///
/// DELETE /url/:id
async fn abort_job(
    State(jobs): State<Arc<dyn JobService>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    let id = job_id(path)?;

    match handle_abort(jobs.as_ref(), AbortJobCommand { id }).await {
        Ok(status) => Ok((StatusCode::OK, Json(status)).into_response()),
        Err(e @ AbortJobError::NotFound) => Ok(job_not_found(id, e)),
        Err(AbortJobError::Scheduler(e)) => Err(e.into()),
    }
}
