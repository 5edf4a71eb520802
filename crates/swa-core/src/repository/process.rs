//! Process registry port.
//!
//! Maps an in-flight job to a handle of the engine process executing it.
//! A handle is present only while a subprocess is alive; the task runner
//! removes it unconditionally when the job finishes.

use swa_types::job::JobId;
use tokio_util::sync::CancellationToken;

/// Handle to a live engine process.
///
/// The engine runner owns the child process and watches `token`; cancelling
/// the token makes it kill and reap the child.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pub pid: Option<u32>,
    pub token: CancellationToken,
}

impl ProcessHandle {
    pub fn new(pid: Option<u32>, token: CancellationToken) -> Self {
        Self { pid, token }
    }

    /// Ask the owning runner to terminate the process.
    pub fn terminate(&self) {
        self.token.cancel();
    }
}

/// Keyed process registry. Synchronous and object-safe so drivers can hold
/// it as `Arc<dyn ProcessRegistry>`.
pub trait ProcessRegistry: Send + Sync {
    fn register(&self, job_id: JobId, handle: ProcessHandle);

    fn unregister(&self, job_id: &JobId) -> Option<ProcessHandle>;

    fn lookup(&self, job_id: &JobId) -> Option<ProcessHandle>;
}
