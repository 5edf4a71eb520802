//! Execution outcome record.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exit code the engine uses for success.
pub const SUCCESS_EXIT_CODE: i32 = 0;

/// Exit code for failures that never reached (or never finished) the engine.
pub const LOCAL_FAILURE_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Failed,
}

/// Outcome of one driver invocation.
///
/// Build results through the constructors, which keep
/// `status == success` iff `exit_code == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ResultStatus,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_files: Option<Vec<PathBuf>>,
}

impl ExecutionResult {
    /// Map an engine exit code and captured streams to a result.
    pub fn from_exit(exit_code: i32, stdout: String, stderr: String) -> Self {
        let status = if exit_code == SUCCESS_EXIT_CODE {
            ResultStatus::Success
        } else {
            ResultStatus::Failed
        };
        let error_message = (status == ResultStatus::Failed)
            .then(|| format!("engine exited with code {exit_code}"));
        Self {
            status,
            stdout,
            stderr,
            exit_code,
            error_message,
            output_files: None,
        }
    }

    /// Validation failure detected before the engine was invoked.
    pub fn local_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: ResultStatus::Failed,
            stdout: String::new(),
            stderr: message.clone(),
            exit_code: LOCAL_FAILURE_EXIT_CODE,
            error_message: Some(message),
            output_files: None,
        }
    }

    /// Unexpected error caught at the task runner boundary.
    pub fn exception(message: impl Into<String>) -> Self {
        Self::local_failure(message)
    }

    pub fn timed_out(timeout: Duration, stdout: String, stderr: String) -> Self {
        let message = format!("execution timed out after {} seconds", timeout.as_secs());
        Self {
            status: ResultStatus::Failed,
            stdout,
            stderr: if stderr.is_empty() { message.clone() } else { stderr },
            exit_code: LOCAL_FAILURE_EXIT_CODE,
            error_message: Some(message),
            output_files: None,
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::local_failure(message)
    }

    /// Attach resolved output files (only meaningful on success).
    pub fn with_output_files(mut self, files: Vec<PathBuf>) -> Self {
        self.output_files = Some(files);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}
