//! Wrapper job submission.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};

use swa_infra::fsutil::prepare_job_workdir;
use swa_types::job::JobSubmissionResponse;
use swa_types::request::WrapperSubmission;

use super::tools::wrapper_id;
use crate::http::error::AppError;
use crate::state::AppState;

pub type Accepted = (StatusCode, [(header::HeaderName, String); 1], Json<JobSubmissionResponse>);

pub(crate) fn accepted(body: JobSubmissionResponse) -> Accepted {
    (
        StatusCode::ACCEPTED,
        [(header::LOCATION, body.status_url.clone())],
        Json(body),
    )
}

/// POST /tool-processes - Run one wrapper as a background job.
///
/// Hidden platform parameters come from the cached metadata; the optional
/// `workdir` is copied into a directory owned by the job.
pub async fn submit(
    State(state): State<AppState>,
    Json(mut submission): Json<WrapperSubmission>,
) -> Result<Accepted, AppError> {
    if submission.wrapper_id.trim().is_empty() {
        return Err(AppError::Validation("'wrapper_id' must be provided".into()));
    }
    submission.wrapper_id = wrapper_id(&submission.wrapper_id);
    let meta = state.metadata.load(&submission.wrapper_id).await?;

    if let Some(src) = &submission.workdir {
        if !tokio::fs::metadata(src).await.is_ok_and(|m| m.is_dir()) {
            return Err(AppError::Validation(format!(
                "workdir '{}' is not a directory",
                src.display()
            )));
        }
    }
    let workdir = prepare_job_workdir(submission.workdir.as_deref())
        .await
        .map_err(|e| AppError::Internal(format!("cannot prepare job workdir: {e}")))?;

    let timeout = Duration::from_secs(submission.timeout_secs.unwrap_or(state.config.wrapper_timeout_secs));
    let request = submission.into_request(&meta.platform_params, workdir);
    tracing::info!(wrapper = %request.component, workdir = %request.workdir.display(), "wrapper submission");

    let driver = state.wrapper_driver.clone();
    let job_id = state
        .jobs
        .submit(move |tracker| async move { driver.execute(&request, timeout, &tracker).await })
        .await?;

    Ok(accepted(JobSubmissionResponse {
        job_id,
        status_url: format!("/tool-processes/{job_id}"),
        log_url: None,
    }))
}
