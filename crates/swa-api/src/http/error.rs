//! Application error type mapping to HTTP status codes and the error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use swa_types::error::{JobError, MetadataError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Job lookup or cancellation errors.
    Job(JobError),
    /// Metadata cache errors.
    Metadata(MetadataError),
    /// Malformed submission.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<JobError> for AppError {
    fn from(e: JobError) -> Self {
        AppError::Job(e)
    }
}

impl From<MetadataError> for AppError {
    fn from(e: MetadataError) -> Self {
        AppError::Metadata(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Job(JobError::NotFound) => (StatusCode::NOT_FOUND, "JOB_NOT_FOUND", "Job not found".to_string()),
            AppError::Job(e @ JobError::CannotCancel(_)) => (StatusCode::CONFLICT, "CANNOT_CANCEL", e.to_string()),
            AppError::Job(e) => (StatusCode::INTERNAL_SERVER_ERROR, "JOB_ERROR", e.to_string()),
            AppError::Metadata(MetadataError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "WRAPPER_NOT_FOUND",
                format!("Wrapper '{id}' not found"),
            ),
            AppError::Metadata(e) => (StatusCode::INTERNAL_SERVER_ERROR, "METADATA_ERROR", e.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }

        let body = json!({
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use swa_types::job::JobStatus;

    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(AppError::Job(JobError::NotFound).parts().0, StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Job(JobError::CannotCancel(JobStatus::Completed)).parts().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Metadata(MetadataError::NotFound("bio/x".into())).parts().1,
            "WRAPPER_NOT_FOUND"
        );
        assert_eq!(
            AppError::Metadata(MetadataError::Malformed("bad".into())).parts().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Validation("x".into()).parts().0, StatusCode::BAD_REQUEST);
    }
}
