//! Job submission and cancellation.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use swa_types::error::JobError;
use swa_types::job::{Job, JobId, JobStatus};
use swa_types::result::ExecutionResult;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::runner::TaskRunner;
use super::tracker::ProcessTracker;
use crate::repository::job::JobRepository;
use crate::repository::process::ProcessRegistry;

pub const CANCELLED_BEFORE_EXECUTION: &str = "cancelled before execution";

/// Submission path shared by wrapper and workflow jobs.
///
/// Generic over `R: JobRepository` so the in-memory store can be swapped
/// for a durable one.
pub struct JobService<R: JobRepository> {
    jobs: Arc<R>,
    processes: Arc<dyn ProcessRegistry>,
    runner: Arc<TaskRunner<R>>,
    /// Job-level cancellation tokens, removed when the runner finishes.
    tokens: Arc<DashMap<JobId, CancellationToken>>,
}

impl<R: JobRepository + 'static> JobService<R> {
    pub fn new(jobs: Arc<R>, processes: Arc<dyn ProcessRegistry>, max_concurrent: Option<usize>) -> Self {
        let runner = TaskRunner::new(jobs.clone(), processes.clone());
        let runner = match max_concurrent {
            Some(max) => runner.with_limit(max),
            None => runner,
        };
        Self {
            jobs,
            processes,
            runner: Arc::new(runner),
            tokens: Arc::new(DashMap::new()),
        }
    }

    /// Create a job under a fresh id and schedule `make_task` in the background.
    pub async fn submit<F, Fut>(&self, make_task: F) -> Result<JobId, JobError>
    where
        F: FnOnce(ProcessTracker) -> Fut,
        Fut: Future<Output = anyhow::Result<ExecutionResult>> + Send + 'static,
    {
        self.submit_with_id(Uuid::now_v7(), None, make_task).await
    }

    /// Like [`submit`](Self::submit) with a caller-chosen id, for jobs whose
    /// log location must be derived from the id before the job exists.
    pub async fn submit_with_id<F, Fut>(
        &self,
        job_id: JobId,
        log_location: Option<PathBuf>,
        make_task: F,
    ) -> Result<JobId, JobError>
    where
        F: FnOnce(ProcessTracker) -> Fut,
        Fut: Future<Output = anyhow::Result<ExecutionResult>> + Send + 'static,
    {
        self.jobs.create(job_id).await?;
        if let Some(path) = log_location {
            self.jobs.set_log_location(&job_id, path).await?;
        }

        let token = CancellationToken::new();
        self.tokens.insert(job_id, token.clone());
        let tracker = ProcessTracker::new(job_id, self.processes.clone(), token);
        let task = make_task(tracker);

        let runner = self.runner.clone();
        let tokens = self.tokens.clone();
        tokio::spawn(async move {
            runner.run(job_id, task).await;
            tokens.remove(&job_id);
        });

        tracing::info!(job_id = %job_id, "job accepted");
        Ok(job_id)
    }

    pub async fn get(&self, job_id: &JobId) -> Result<Job, JobError> {
        self.jobs.get(job_id).await?.ok_or(JobError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<Job>, JobError> {
        let mut jobs = self.jobs.list().await?;
        jobs.sort_by_key(|j| j.created_time);
        Ok(jobs)
    }

    /// Cancel a job.
    ///
    /// * `accepted` -> `failed` synchronously, the task never starts.
    /// * `running` -> the engine process is asked to terminate; its exit
    ///   drives the job to `failed`.
    /// * terminal -> [`JobError::CannotCancel`], nothing is mutated.
    pub async fn cancel(&self, job_id: &JobId) -> Result<String, JobError> {
        let job = self.get(job_id).await?;

        if job.status == JobStatus::Accepted {
            let result = ExecutionResult::cancelled(CANCELLED_BEFORE_EXECUTION);
            if self.jobs.fail_if_accepted(job_id, result).await? {
                if let Some(token) = self.tokens.get(job_id) {
                    token.cancel();
                }
                tracing::info!(job_id = %job_id, "job cancelled before execution");
                return Ok(format!("Job {job_id} cancelled before execution"));
            }
        }

        // Lost the race with the runner, or it was already running.
        let job = self.get(job_id).await?;
        match job.status {
            JobStatus::Running => {
                match self.processes.lookup(job_id) {
                    Some(handle) => {
                        tracing::info!(job_id = %job_id, pid = ?handle.pid, "terminating engine process");
                        handle.terminate();
                    }
                    None => {
                        if let Some(token) = self.tokens.get(job_id) {
                            token.cancel();
                        }
                        tracing::info!(job_id = %job_id, "no process registered yet, cancelling job token");
                    }
                }
                Ok(format!("Cancellation requested for job {job_id}"))
            }
            status => Err(JobError::CannotCancel(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use swa_types::result::ResultStatus;

    use super::*;
    use crate::job::testing::{MemoryJobs, RecordingRegistry};

    fn service() -> (JobService<MemoryJobs>, Arc<MemoryJobs>, Arc<RecordingRegistry>) {
        let jobs = Arc::new(MemoryJobs::default());
        let registry = Arc::new(RecordingRegistry::default());
        (JobService::new(jobs.clone(), registry.clone(), None), jobs, registry)
    }

    async fn wait_terminal(service: &JobService<MemoryJobs>, id: &JobId) -> Job {
        for _ in 0..200 {
            let job = service.get(id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never reached a terminal state");
    }

    /// Stand-in for a driver: registers a process and waits for termination.
    async fn cancellable_task(tracker: ProcessTracker) -> anyhow::Result<ExecutionResult> {
        let token = tracker.register(Some(7));
        tokio::select! {
            _ = token.cancelled() => Ok(ExecutionResult::cancelled("terminated")),
            _ = tokio::time::sleep(Duration::from_secs(30)) => {
                Ok(ExecutionResult::from_exit(0, String::new(), String::new()))
            }
        }
    }

    #[tokio::test]
    async fn submit_runs_to_completion() {
        let (service, _, _) = service();
        let id = service
            .submit(|_| async { Ok(ExecutionResult::from_exit(0, "done".into(), String::new())) })
            .await
            .unwrap();
        let job = wait_terminal(&service, &id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancel_running_job_terminates_process() {
        let (service, jobs, _) = service();
        let id = service.submit(cancellable_task).await.unwrap();

        for _ in 0..100 {
            if service.get(&id).await.unwrap().status == JobStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        let message = service.cancel(&id).await.unwrap();
        assert!(message.contains("Cancellation requested"));

        let job = wait_terminal(&service, &id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.result.unwrap().exit_code, -1);
        assert_eq!(
            jobs.history(&id),
            vec![JobStatus::Accepted, JobStatus::Running, JobStatus::Failed]
        );
    }

    #[tokio::test]
    async fn cancel_accepted_job_fails_it_without_running() {
        let jobs = Arc::new(MemoryJobs::default());
        let registry = Arc::new(RecordingRegistry::default());
        let service = JobService::new(jobs.clone(), registry.clone(), Some(1));

        // Occupy the single slot so the next job stays accepted.
        let blocker = service.submit(cancellable_task).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let queued = service.submit(cancellable_task).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(service.get(&queued).await.unwrap().status, JobStatus::Accepted);

        let message = service.cancel(&queued).await.unwrap();
        assert!(message.contains("cancelled before execution"));
        let job = service.get(&queued).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.result.unwrap().status, ResultStatus::Failed);

        service.cancel(&blocker).await.unwrap();
        wait_terminal(&service, &blocker).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(jobs.history(&queued), vec![JobStatus::Accepted, JobStatus::Failed]);
        assert_eq!(registry.registrations(&queued), 0);
    }

    #[tokio::test]
    async fn cancel_terminal_job_is_rejected_and_unchanged() {
        let (service, _, _) = service();
        let id = service
            .submit(|_| async { Ok(ExecutionResult::from_exit(0, String::new(), String::new())) })
            .await
            .unwrap();
        let before = wait_terminal(&service, &id).await;

        let err = service.cancel(&id).await.unwrap_err();
        assert!(matches!(err, JobError::CannotCancel(JobStatus::Completed)));
        assert_eq!(err.to_string(), "cannot cancel job in completed");
        assert_eq!(service.get(&id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn cancel_unknown_job() {
        let (service, _, _) = service();
        let err = service.cancel(&Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, JobError::NotFound));
    }

    #[tokio::test]
    async fn submit_with_id_records_log_location() {
        let (service, _, _) = service();
        let id = Uuid::now_v7();
        service
            .submit_with_id(id, Some(PathBuf::from("/tmp/x.log")), |_| async {
                Ok(ExecutionResult::from_exit(0, String::new(), String::new()))
            })
            .await
            .unwrap();
        let job = wait_terminal(&service, &id).await;
        assert_eq!(job.log_location, Some(PathBuf::from("/tmp/x.log")));
    }
}
