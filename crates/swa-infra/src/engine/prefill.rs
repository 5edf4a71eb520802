//! Upload of a workflow execution directory to remote storage before the
//! engine starts.

use std::path::{Path, PathBuf};

use swa_core::storage::BoxObjectStore;
use swa_core::storage::prefix::S3Location;
use swa_types::error::StorageError;
use walkdir::WalkDir;

/// Engine bookkeeping directory, never uploaded.
const ENGINE_STATE_DIR: &str = ".snakemake";

/// Files to upload: `(absolute path, path relative to root)`.
///
/// Symlinks are followed, so linked inputs upload their targets' content.
pub fn collect_uploads(root: &Path) -> Vec<(PathBuf, PathBuf)> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.file_name() != ENGINE_STATE_DIR);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during prefill");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().is_some_and(|ext| ext == "log") {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            files.push((entry.path().to_path_buf(), rel.to_path_buf()));
        }
    }
    files
}

/// Upload everything below `root` to `prefix`. Returns the number of files.
pub async fn prefill(store: &BoxObjectStore, root: &Path, prefix: &str) -> Result<usize, StorageError> {
    let location = S3Location::parse(prefix)?;
    let walk_root = root.to_path_buf();
    let files = tokio::task::spawn_blocking(move || collect_uploads(&walk_root))
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))?;

    tracing::info!(count = files.len(), bucket = %location.bucket, prefix = %location.key_prefix, "prefilling remote storage");
    for (path, rel) in &files {
        let key = location.key_for(rel);
        store.put_file(&location.bucket, &key, path).await?;
    }
    Ok(files.len())
}
