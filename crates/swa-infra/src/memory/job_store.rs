use std::path::PathBuf;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use swa_core::repository::job::JobRepository;
use swa_types::error::RepositoryError;
use swa_types::job::{Job, JobId, JobStatus};
use swa_types::result::ExecutionResult;

/// Job registry with no eviction and no durability.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobId, Job>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply_result(job: &mut Job, result: ExecutionResult) {
    job.status = if result.is_success() {
        JobStatus::Completed
    } else {
        JobStatus::Failed
    };
    job.result = Some(result);
}

impl JobRepository for InMemoryJobStore {
    async fn create(&self, job_id: JobId) -> Result<Job, RepositoryError> {
        match self.jobs.entry(job_id) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(format!("job {job_id} already exists"))),
            Entry::Vacant(slot) => Ok(slot.insert(Job::accepted(job_id)).clone()),
        }
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs.get(job_id).map(|j| j.clone()))
    }

    async fn list(&self) -> Result<Vec<Job>, RepositoryError> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|j| j.value().clone()).collect();
        jobs.sort_by_key(|j| j.created_time);
        Ok(jobs)
    }

    async fn set_running(&self, job_id: &JobId) -> Result<bool, RepositoryError> {
        let mut job = self.jobs.get_mut(job_id).ok_or(RepositoryError::NotFound)?;
        if job.status != JobStatus::Accepted {
            return Ok(false);
        }
        job.status = JobStatus::Running;
        Ok(true)
    }

    async fn set_result(&self, job_id: &JobId, result: ExecutionResult) -> Result<bool, RepositoryError> {
        let mut job = self.jobs.get_mut(job_id).ok_or(RepositoryError::NotFound)?;
        if job.status.is_terminal() {
            return Ok(false);
        }
        apply_result(&mut job, result);
        Ok(true)
    }

    async fn fail_if_accepted(&self, job_id: &JobId, result: ExecutionResult) -> Result<bool, RepositoryError> {
        let mut job = self.jobs.get_mut(job_id).ok_or(RepositoryError::NotFound)?;
        if job.status != JobStatus::Accepted {
            return Ok(false);
        }
        apply_result(&mut job, result);
        Ok(true)
    }

    async fn set_log_location(&self, job_id: &JobId, path: PathBuf) -> Result<(), RepositoryError> {
        let mut job = self.jobs.get_mut(job_id).ok_or(RepositoryError::NotFound)?;
        job.log_location = Some(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let store = InMemoryJobStore::new();
        let id = Uuid::now_v7();
        let job = store.create(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Accepted);
        assert!(matches!(store.create(id).await, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn lifecycle_accepted_running_completed() {
        let store = InMemoryJobStore::new();
        let id = Uuid::now_v7();
        store.create(id).await.unwrap();

        assert!(store.set_running(&id).await.unwrap());
        assert!(!store.set_running(&id).await.unwrap(), "second transition refused");

        let ok = ExecutionResult::from_exit(0, String::new(), String::new());
        assert!(store.set_result(&id, ok).await.unwrap());
        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
    }

    #[tokio::test]
    async fn terminal_jobs_never_change() {
        let store = InMemoryJobStore::new();
        let id = Uuid::now_v7();
        store.create(id).await.unwrap();
        store.set_running(&id).await.unwrap();
        store
            .set_result(&id, ExecutionResult::from_exit(2, String::new(), "err".into()))
            .await
            .unwrap();

        let late = ExecutionResult::from_exit(0, String::new(), String::new());
        assert!(!store.set_result(&id, late.clone()).await.unwrap());
        assert!(!store.fail_if_accepted(&id, late).await.unwrap());
        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.result.unwrap().exit_code, 2);
    }

    #[tokio::test]
    async fn fail_if_accepted_only_from_accepted() {
        let store = InMemoryJobStore::new();
        let id = Uuid::now_v7();
        store.create(id).await.unwrap();
        assert!(store
            .fail_if_accepted(&id, ExecutionResult::cancelled("cancelled before execution"))
            .await
            .unwrap());
        assert!(!store.set_running(&id).await.unwrap());
        assert_eq!(store.get(&id).await.unwrap().unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let store = InMemoryJobStore::new();
        let id = Uuid::now_v7();
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(matches!(store.set_running(&id).await, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn list_is_oldest_first() {
        let store = InMemoryJobStore::new();
        let first = Uuid::now_v7();
        store.create(first).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = Uuid::now_v7();
        store.create(second).await.unwrap();
        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|j| j.job_id).collect();
        assert_eq!(ids, vec![first, second]);
    }
}
