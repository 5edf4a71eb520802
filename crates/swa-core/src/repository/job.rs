//! Job repository trait definition.

use std::path::PathBuf;

use swa_types::error::RepositoryError;
use swa_types::job::{Job, JobId};
use swa_types::result::ExecutionResult;

/// Repository trait for job lifecycle records.
///
/// Every method is a single mutation; implementations must make each one
/// atomic with respect to concurrent readers.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait JobRepository: Send + Sync {
    /// Insert a new job in `accepted` state. Fails with `Conflict` if the id exists.
    fn create(
        &self,
        job_id: JobId,
    ) -> impl std::future::Future<Output = Result<Job, RepositoryError>> + Send;

    fn get(
        &self,
        job_id: &JobId,
    ) -> impl std::future::Future<Output = Result<Option<Job>, RepositoryError>> + Send;

    /// All jobs, oldest first.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<Job>, RepositoryError>> + Send;

    /// Move `accepted -> running`. Returns `false` if the job was not
    /// `accepted` (e.g. it was cancelled before the runner picked it up).
    fn set_running(
        &self,
        job_id: &JobId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Store the terminal result; status follows `result.status`.
    /// A job that is already terminal is left untouched (`Ok(false)`).
    fn set_result(
        &self,
        job_id: &JobId,
        result: ExecutionResult,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Atomically fail a job that is still `accepted`. Returns `false` if it
    /// had already left that state.
    fn fail_if_accepted(
        &self,
        job_id: &JobId,
        result: ExecutionResult,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    fn set_log_location(
        &self,
        job_id: &JobId,
        path: PathBuf,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
