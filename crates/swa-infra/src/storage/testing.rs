use std::path::Path;
use std::sync::{Arc, Mutex};

use swa_core::storage::ObjectStore;
use swa_types::error::StorageError;

/// Records uploaded `(bucket, key)` pairs; fails every upload when `failing`.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    keys: Arc<Mutex<Vec<(String, String)>>>,
    failing: bool,
}

impl MemoryObjectStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<(String, String)> {
        let mut keys = self.keys.lock().unwrap().clone();
        keys.sort();
        keys
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StorageError> {
        if self.failing {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "connection refused".into(),
            });
        }
        assert!(path.is_file(), "uploads must point at files");
        self.keys.lock().unwrap().push((bucket.to_string(), key.to_string()));
        Ok(())
    }
}
