//! Per-job process tracking handed to execution drivers.

use std::sync::Arc;

use swa_types::job::JobId;
use tokio_util::sync::CancellationToken;

use crate::repository::process::{ProcessHandle, ProcessRegistry};

/// What a driver needs to make its subprocess cancellable.
///
/// Jobs submitted through the job service get an attached tracker; direct
/// runs (e.g. `swa verify`) use [`ProcessTracker::detached`].
#[derive(Clone)]
pub struct ProcessTracker {
    job_id: Option<JobId>,
    registry: Option<Arc<dyn ProcessRegistry>>,
    cancel: CancellationToken,
}

impl ProcessTracker {
    pub fn new(job_id: JobId, registry: Arc<dyn ProcessRegistry>, cancel: CancellationToken) -> Self {
        Self {
            job_id: Some(job_id),
            registry: Some(registry),
            cancel,
        }
    }

    pub fn detached() -> Self {
        Self {
            job_id: None,
            registry: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    /// Cancelled when the job is cancelled before a process was registered.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Register a freshly spawned process. The returned token fires on
    /// either a process-level terminate or a job-level cancel.
    pub fn register(&self, pid: Option<u32>) -> CancellationToken {
        let token = self.cancel.child_token();
        if let (Some(job_id), Some(registry)) = (self.job_id, &self.registry) {
            registry.register(job_id, ProcessHandle::new(pid, token.clone()));
            tracing::debug!(job_id = %job_id, pid = ?pid, "registered engine process");
        }
        token
    }

    pub fn unregister(&self) {
        if let (Some(job_id), Some(registry)) = (self.job_id, &self.registry) {
            registry.unregister(&job_id);
        }
    }
}

impl std::fmt::Debug for ProcessTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessTracker")
            .field("job_id", &self.job_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
