//! Data-directory layout.
//!
//! ```text
//! <data_dir>/
//!   config.toml
//!   parser/        metadata cache, one JSON file per wrapper
//!   logs/          <job_id>.log for workflow jobs
//!   runs/          isolated workflow execution directories
//!   conda/         shared environment cache
//! ```

use std::path::{Path, PathBuf};

use swa_types::config::ServerConfig;

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `SWA_DATA_DIR` environment variable
/// 2. `~/.swa`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SWA_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".swa");
    }

    // Last resort: current directory
    PathBuf::from(".swa")
}

/// Paths derived from the data directory and the loaded config.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
    conda_prefix: Option<PathBuf>,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>, config: &ServerConfig) -> Self {
        Self {
            root: root.into(),
            conda_prefix: config.engine.conda_prefix.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("parser")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.root.join("runs")
    }

    pub fn conda_prefix(&self) -> PathBuf {
        self.conda_prefix.clone().unwrap_or_else(|| self.root.join("conda"))
    }

    pub fn job_log(&self, job_id: &uuid::Uuid) -> PathBuf {
        self.log_dir().join(format!("{job_id}.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_dir_env_override() {
        // SAFETY: test-only; no other test in this crate reads SWA_DATA_DIR.
        unsafe { std::env::set_var("SWA_DATA_DIR", "/tmp/swa-test") };
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/swa-test"));
        unsafe { std::env::remove_var("SWA_DATA_DIR") };
    }

    #[test]
    fn test_layout_paths() {
        let mut config = ServerConfig::default();
        let layout = DataLayout::new("/data", &config);
        assert_eq!(layout.cache_dir(), PathBuf::from("/data/parser"));
        assert_eq!(layout.log_dir(), PathBuf::from("/data/logs"));
        assert_eq!(layout.runs_dir(), PathBuf::from("/data/runs"));
        assert_eq!(layout.conda_prefix(), PathBuf::from("/data/conda"));

        config.engine.conda_prefix = Some(PathBuf::from("/shared/conda"));
        let layout = DataLayout::new("/data", &config);
        assert_eq!(layout.conda_prefix(), PathBuf::from("/shared/conda"));

        let id = uuid::Uuid::nil();
        assert_eq!(
            layout.job_log(&id),
            PathBuf::from("/data/logs/00000000-0000-0000-0000-000000000000.log")
        );
    }
}
