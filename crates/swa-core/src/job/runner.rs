//! Background task runner.
//!
//! Drives one job through its lifecycle:
//!
//! 1. `accepted -> running` (a job cancelled while accepted is skipped).
//! 2. Run the task on its own tokio task and await it.
//! 3. Store the returned result; status follows `result.status`.
//! 4. An error or panic from the task becomes a failed result with exit `-1`.
//! 5. Remove the job's process handle, whatever happened above.

use std::future::Future;
use std::sync::Arc;

use swa_types::job::JobId;
use swa_types::result::ExecutionResult;
use tokio::sync::Semaphore;

use crate::repository::job::JobRepository;
use crate::repository::process::ProcessRegistry;

pub struct TaskRunner<R: JobRepository> {
    jobs: Arc<R>,
    processes: Arc<dyn ProcessRegistry>,
    /// Bounds concurrently running jobs when configured.
    limiter: Option<Arc<Semaphore>>,
}

impl<R: JobRepository + 'static> TaskRunner<R> {
    pub fn new(jobs: Arc<R>, processes: Arc<dyn ProcessRegistry>) -> Self {
        Self {
            jobs,
            processes,
            limiter: None,
        }
    }

    /// Allow at most `max` jobs in `running` at once; the rest wait in `accepted`.
    pub fn with_limit(mut self, max: usize) -> Self {
        self.limiter = Some(Arc::new(Semaphore::new(max.max(1))));
        self
    }

    pub async fn run<F>(&self, job_id: JobId, task: F)
    where
        F: Future<Output = anyhow::Result<ExecutionResult>> + Send + 'static,
    {
        let _permit = match &self.limiter {
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        };

        match self.jobs.set_running(&job_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(job_id = %job_id, "job left accepted before start, skipping");
                self.processes.unregister(&job_id);
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "failed to mark job running");
                self.processes.unregister(&job_id);
                return;
            }
        }
        tracing::info!(job_id = %job_id, "job running");

        let result = match tokio::spawn(task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(job_id = %job_id, error = %e, "job task returned an error");
                ExecutionResult::exception(format!("{e:#}"))
            }
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    "job task panicked".to_string()
                } else {
                    format!("job task aborted: {join_err}")
                };
                tracing::error!(job_id = %job_id, "{message}");
                ExecutionResult::exception(message)
            }
        };

        let status = result.status;
        let exit_code = result.exit_code;
        match self.jobs.set_result(&job_id, result).await {
            Ok(true) => tracing::info!(job_id = %job_id, ?status, exit_code, "job finished"),
            Ok(false) => tracing::warn!(job_id = %job_id, "job already terminal, result dropped"),
            Err(e) => tracing::error!(job_id = %job_id, error = %e, "failed to store job result"),
        }

        self.processes.unregister(&job_id);
    }
}
