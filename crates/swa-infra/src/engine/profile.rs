//! Execution profile lookup.
//!
//! A profile is a directory holding an engine config file. Profiles are
//! searched in the workflow's own `profiles/` first, then in the global
//! profile directory.

use std::path::{Path, PathBuf};

use swa_types::error::DriverError;

/// Profile config file names, newest engine convention first.
pub const PROFILE_FILES: [&str; 2] = ["config.v8+.yaml", "config.yaml"];

/// Profile key naming the remote storage prefix.
pub const STORAGE_PREFIX_KEY: &str = "default-storage-prefix";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub dir: PathBuf,
    /// `default-storage-prefix` from the profile config, if declared.
    pub storage_prefix: Option<String>,
}

pub async fn resolve_profile(
    workflow_dir: &Path,
    global_dir: Option<&Path>,
    name: &str,
) -> Result<ResolvedProfile, DriverError> {
    let candidates = [Some(workflow_dir.join("profiles")), global_dir.map(Path::to_path_buf)];
    for base in candidates.into_iter().flatten() {
        let dir = base.join(name);
        if tokio::fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
            let storage_prefix = read_storage_prefix(&dir).await?;
            tracing::debug!(profile = %dir.display(), prefix = ?storage_prefix, "resolved profile");
            return Ok(ResolvedProfile {
                dir: std::path::absolute(dir)?,
                storage_prefix,
            });
        }
    }
    Err(DriverError::ProfileNotFound(name.to_string()))
}

async fn read_storage_prefix(profile_dir: &Path) -> Result<Option<String>, DriverError> {
    for file in PROFILE_FILES {
        let path = profile_dir.join(file);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        let doc: serde_yaml_ng::Value = serde_yaml_ng::from_str(&content)
            .map_err(|e| DriverError::Config(format!("{}: {e}", path.display())))?;
        return Ok(doc
            .get(STORAGE_PREFIX_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string));
    }
    Ok(None)
}
