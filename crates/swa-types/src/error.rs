use thiserror::Error;

use crate::job::JobStatus;

/// Errors from job store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("query error: {0}")]
    Query(String),
}

/// Errors surfaced by the job service.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found")]
    NotFound,

    #[error("cannot cancel job in {0}")]
    CannotCancel(JobStatus),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors while parsing or compiling rule definitions.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("failed to read rule definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed rule definition: {0}")]
    Parse(String),

    #[error("invalid keyword '{0}': must be an identifier")]
    InvalidKeyword(String),

    #[error("rule reflection failed: {0}")]
    Reflection(String),
}

/// Errors while preparing an engine invocation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration document: {0}")]
    Config(String),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from object store uploads.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage prefix '{0}'")]
    InvalidPrefix(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },
}

/// Errors from the metadata cache.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("wrapper not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed metadata: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_error_names_the_state() {
        let err = JobError::CannotCancel(JobStatus::Completed);
        assert_eq!(err.to_string(), "cannot cancel job in completed");
    }

    #[test]
    fn repository_error_display() {
        let err = RepositoryError::Conflict("job exists".to_string());
        assert_eq!(err.to_string(), "conflict: job exists");
    }
}
