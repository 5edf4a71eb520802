//! Workflow job submission and log streaming.

use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use uuid::Uuid;

use swa_types::job::JobSubmissionResponse;
use swa_types::request::WorkflowSubmission;

use super::tool_process::{Accepted, accepted};
use crate::http::error::AppError;
use crate::state::AppState;

/// POST /workflow-processes - Run a whole workflow as a background job.
///
/// Engine output is streamed to a per-job log file readable at `log_url`
/// while the job runs.
pub async fn submit(
    State(state): State<AppState>,
    Json(submission): Json<WorkflowSubmission>,
) -> Result<Accepted, AppError> {
    if submission.workflow_id.trim().is_empty() {
        return Err(AppError::Validation("'workflow_id' must be provided".into()));
    }

    let job_id = Uuid::now_v7();
    let timeout = Duration::from_secs(submission.timeout_secs.unwrap_or(state.config.workflow_timeout_secs));
    let request = submission.into_request(&state.config, Some(job_id));
    let log = state.workflow_driver.log_path(&job_id);
    tracing::info!(job_id = %job_id, workflow = %request.workflow_id, profile = ?request.profile, "workflow submission");

    let driver = state.workflow_driver.clone();
    state
        .jobs
        .submit_with_id(job_id, Some(log), move |tracker| async move {
            driver.execute(&request, timeout, &tracker).await
        })
        .await?;

    Ok(accepted(JobSubmissionResponse {
        job_id,
        status_url: format!("/workflow-processes/{job_id}"),
        log_url: Some(format!("/workflow-processes/{job_id}/log")),
    }))
}

/// GET /workflow-processes/{job_id}/log - Plain-text engine log.
pub async fn get_log(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = state.jobs.get(&job_id).await?;
    let text = match &job.log_location {
        Some(path) => match tokio::fs::read(path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => placeholder(&job_id),
            Err(e) => return Err(AppError::Internal(format!("cannot read log: {e}"))),
        },
        None => placeholder(&job_id),
    };
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

fn placeholder(job_id: &Uuid) -> String {
    format!("Log for job {job_id} is not available yet.\n")
}
