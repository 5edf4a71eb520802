//! Discovery of runnable workflows under the workflows directory.

use std::path::Path;

use swa_types::metadata::WorkflowInfo;

use crate::engine::profile::PROFILE_FILES;
use crate::engine::workflow::{BASE_CONFIG, ENTRY_POINTS};

/// Every immediate sub-directory of `dir` that has an entry point, sorted by id.
pub async fn list_workflows(dir: &Path) -> std::io::Result<Vec<WorkflowInfo>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut workflows = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        let path = entry.path();
        let Some(snakefile) = ENTRY_POINTS.into_iter().find(|e| path.join(e).is_file()) else {
            continue;
        };
        workflows.push(WorkflowInfo {
            id: name,
            snakefile: snakefile.to_string(),
            has_config: path.join(BASE_CONFIG).is_file(),
            profiles: local_profiles(&path.join("profiles")).await,
        });
    }
    workflows.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(workflows)
}

async fn local_profiles(dir: &Path) -> Vec<String> {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return Vec::new();
    };
    let mut profiles = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if PROFILE_FILES.iter().any(|f| path.join(f).is_file()) {
            profiles.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    profiles.sort();
    profiles
}
