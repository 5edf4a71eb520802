//! Job listing and cancellation, shared by wrapper and workflow jobs.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use swa_types::job::{CancelResponse, Job, JobList};

use crate::http::error::AppError;
use crate::state::AppState;

/// GET /jobs - Every job, oldest first.
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<JobList>, AppError> {
    Ok(Json(state.jobs.list().await?.into()))
}

/// GET /tool-processes/{job_id} and /workflow-processes/{job_id}.
pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> Result<Json<Job>, AppError> {
    Ok(Json(state.jobs.get(&job_id).await?))
}

/// POST /jobs/{job_id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let message = state.jobs.cancel(&job_id).await?;
    Ok(Json(CancelResponse { message }))
}
