use dashmap::DashMap;
use swa_core::repository::process::{ProcessHandle, ProcessRegistry};
use swa_types::job::JobId;

#[derive(Debug, Default)]
pub struct InMemoryProcessRegistry {
    processes: DashMap<JobId, ProcessHandle>,
}

impl InMemoryProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

impl ProcessRegistry for InMemoryProcessRegistry {
    fn register(&self, job_id: JobId, handle: ProcessHandle) {
        self.processes.insert(job_id, handle);
    }

    fn unregister(&self, job_id: &JobId) -> Option<ProcessHandle> {
        self.processes.remove(job_id).map(|(_, handle)| handle)
    }

    fn lookup(&self, job_id: &JobId) -> Option<ProcessHandle> {
        self.processes.get(job_id).map(|h| h.clone())
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn register_lookup_unregister() {
        let registry = InMemoryProcessRegistry::new();
        let id = Uuid::now_v7();
        let token = CancellationToken::new();
        registry.register(id, ProcessHandle::new(Some(99), token.clone()));

        let handle = registry.lookup(&id).unwrap();
        handle.terminate();
        assert!(token.is_cancelled());

        assert!(registry.unregister(&id).is_some());
        assert!(registry.lookup(&id).is_none());
        assert!(registry.unregister(&id).is_none());
        assert!(registry.is_empty());
    }
}
