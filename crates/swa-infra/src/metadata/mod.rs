//! On-disk metadata cache.
//!
//! `swa parse` fills the cache directory with one JSON document per wrapper;
//! the server only ever reads it.

pub mod scan;
pub mod workflows;

use std::path::{Component, Path, PathBuf};

use swa_types::error::MetadataError;
use swa_types::metadata::WrapperMetadata;

#[derive(Debug, Clone)]
pub struct MetadataCache {
    dir: PathBuf,
}

impl MetadataCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file name for a wrapper id: `bio/samtools/faidx` becomes
    /// `bio__samtools__faidx.json`.
    pub fn file_name(id: &str) -> String {
        format!("{}.json", id.trim_matches('/').replace('/', "__"))
    }

    fn entry_path(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.trim().is_empty()
            && Path::new(id.trim_matches('/'))
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        valid.then(|| self.dir.join(Self::file_name(id)))
    }

    pub async fn load(&self, id: &str) -> Result<WrapperMetadata, MetadataError> {
        let path = self
            .entry_path(id)
            .ok_or_else(|| MetadataError::NotFound(id.to_string()))?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MetadataError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| MetadataError::Malformed(format!("{}: {e}", path.display())))
    }

    /// Every cached wrapper, sorted by id. Corrupt entries are skipped.
    pub async fn list(&self) -> Result<Vec<WrapperMetadata>, MetadataError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(cache = %self.dir.display(), "metadata cache missing; run `swa parse` first");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut wrappers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<WrapperMetadata>(&content) {
                Ok(meta) => wrappers.push(meta),
                Err(e) => tracing::warn!(file = %path.display(), error = %e, "skipping corrupt cache entry"),
            }
        }
        wrappers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(wrappers)
    }

    pub async fn store(&self, meta: &WrapperMetadata) -> Result<(), MetadataError> {
        let path = self
            .entry_path(&meta.id)
            .ok_or_else(|| MetadataError::Malformed(format!("invalid wrapper id '{}'", meta.id)))?;
        let json = serde_json::to_string_pretty(meta).map_err(|e| MetadataError::Malformed(e.to_string()))?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Remove every entry, leaving an empty cache directory.
    pub async fn clear(&self) -> Result<(), MetadataError> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }
}
