//! Server configuration types.
//!
//! `ServerConfig` is the top-level `config.toml` under the data directory.
//! Every field has a default so an empty (or missing) file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::request::PrefillMode;

/// Top-level configuration for the swa server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Root of the wrapper repository (`bio/...` components live below it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrappers_path: Option<PathBuf>,

    /// Directory containing one sub-directory per workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflows_dir: Option<PathBuf>,

    /// Default execution profile for workflow jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_profile: Option<String>,

    /// Default prefill behaviour for workflow jobs.
    #[serde(default)]
    pub prefill: PrefillMode,

    /// Upper bound on concurrently running jobs (None = unbounded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_jobs: Option<usize>,

    #[serde(default = "default_wrapper_timeout_secs")]
    pub wrapper_timeout_secs: u64,

    #[serde(default = "default_workflow_timeout_secs")]
    pub workflow_timeout_secs: u64,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_wrapper_timeout_secs() -> u64 {
    600
}

fn default_workflow_timeout_secs() -> u64 {
    3600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            wrappers_path: None,
            workflows_dir: None,
            workflow_profile: None,
            prefill: PrefillMode::default(),
            max_concurrent_jobs: None,
            wrapper_timeout_secs: default_wrapper_timeout_secs(),
            workflow_timeout_secs: default_workflow_timeout_secs(),
            engine: EngineConfig::default(),
            workflow: WorkflowConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// How the engine is invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable (looked up on `PATH` when not absolute).
    #[serde(default = "default_program")]
    pub program: String,

    /// Interpreter used by the reflective rule parser.
    #[serde(default = "default_python")]
    pub python: String,

    /// Shared environment cache; defaults to `<data_dir>/conda`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conda_prefix: Option<PathBuf>,

    /// Build per-rule environments when the component ships a descriptor.
    #[serde(default = "default_true")]
    pub use_conda: bool,
}

fn default_program() -> String {
    "snakemake".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            python: default_python(),
            conda_prefix: None,
            use_conda: true,
        }
    }
}

/// Workflow driver settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Run workflows in `<data_dir>/runs/<job_id>` instead of in place.
    #[serde(default)]
    pub isolate: bool,

    /// Global profile directory searched after the workflow's own `profiles/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,
}

/// Object store connection used by workflow prefill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom endpoint (MinIO and other S3-compatible stores).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default = "default_true")]
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            region: None,
            force_path_style: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default_values() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8082);
        assert_eq!(config.wrapper_timeout_secs, 600);
        assert_eq!(config.engine.program, "snakemake");
        assert!(config.max_concurrent_jobs.is_none());
        assert_eq!(config.prefill, PrefillMode::Off);
    }

    #[test]
    fn test_server_config_deserialize_empty() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_server_config_deserialize_with_values() {
        let toml_str = r#"
port = 9000
wrappers_path = "/opt/snakemake-wrappers"
workflow_profile = "k3s-s3"
prefill = "required"
max_concurrent_jobs = 4

[engine]
program = "/usr/local/bin/snakemake"
use_conda = false

[workflow]
isolate = true

[storage]
endpoint_url = "http://minio:9000"
"#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.workflow_profile.as_deref(), Some("k3s-s3"));
        assert_eq!(config.prefill, PrefillMode::Required);
        assert_eq!(config.max_concurrent_jobs, Some(4));
        assert!(!config.engine.use_conda);
        assert_eq!(config.engine.python, "python3");
        assert!(config.workflow.isolate);
        assert!(config.storage.force_path_style);
    }
}
