//! Object store port used by workflow prefill.
//!
//! Same dispatch shape as the other async ports: an RPITIT trait, an
//! object-safe `ObjectStoreDyn` with boxed futures blanket-implemented for
//! every `ObjectStore`, and a `BoxObjectStore` wrapper for runtime selection.

pub mod prefix;

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use swa_types::error::StorageError;

pub trait ObjectStore: Send + Sync {
    /// Upload the local file at `path` to `bucket/key`.
    fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Object-safe version of [`ObjectStore`].
pub trait ObjectStoreDyn: Send + Sync {
    fn put_file_boxed<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;
}

impl<T: ObjectStore> ObjectStoreDyn for T {
    fn put_file_boxed<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(self.put_file(bucket, key, path))
    }
}

/// Type-erased object store.
pub struct BoxObjectStore {
    inner: Box<dyn ObjectStoreDyn>,
}

impl BoxObjectStore {
    pub fn new<T: ObjectStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }

    pub async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StorageError> {
        self.inner.put_file_boxed(bucket, key, path).await
    }
}
