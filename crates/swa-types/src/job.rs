//! Job lifecycle types.
//!
//! A job is created `accepted` by the submission path, moved to `running`
//! by the task runner and finally to `completed` or `failed`.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::ExecutionResult;

/// Opaque job identifier (UUIDv7, time-sortable).
pub type JobId = Uuid;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Accepted,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Accepted => "accepted",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A job record as stored in the job registry and returned by status URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_time: DateTime<Utc>,
    /// Present once the job is terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    /// Per-job log file, for workflow jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_location: Option<PathBuf>,
}

impl Job {
    /// A fresh job in the `accepted` state.
    pub fn accepted(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Accepted,
            created_time: Utc::now(),
            result: None,
            log_location: None,
        }
    }
}

/// Response body of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmissionResponse {
    pub job_id: JobId,
    pub status_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
}

/// Response body of `GET /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobList {
    pub jobs: Vec<Job>,
    pub total_count: usize,
}

impl From<Vec<Job>> for JobList {
    fn from(jobs: Vec<Job>) -> Self {
        let total_count = jobs.len();
        Self { jobs, total_count }
    }
}

/// Response body of a successful cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub message: String,
}
