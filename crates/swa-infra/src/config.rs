//! Server configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.swa/` in production)
//! and deserializes it into [`ServerConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::Path;

use swa_types::config::ServerConfig;

/// Load server configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`ServerConfig::default()`].
/// - Unreadable or unparsable file: a warning is logged and the default is returned.
pub async fn load_server_config(data_dir: &Path) -> ServerConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ServerConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ServerConfig::default();
        }
    };

    match toml::from_str::<ServerConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            ServerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swa_types::request::PrefillMode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_server_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_server_config(tmp.path()).await;
        assert_eq!(config, ServerConfig::default());
    }

    #[tokio::test]
    async fn load_server_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
port = 9100
workflows_dir = "/srv/workflows"
prefill = "best_effort"

[engine]
conda_prefix = "/srv/conda"
"#,
        )
        .await
        .unwrap();

        let config = load_server_config(tmp.path()).await;
        assert_eq!(config.port, 9100);
        assert_eq!(config.workflows_dir.as_deref(), Some(Path::new("/srv/workflows")));
        assert_eq!(config.prefill, PrefillMode::BestEffort);
        assert_eq!(config.engine.conda_prefix.as_deref(), Some(Path::new("/srv/conda")));
    }

    #[tokio::test]
    async fn load_server_config_malformed_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "port = \"not a number\"\n[[[")
            .await
            .unwrap();
        let config = load_server_config(tmp.path()).await;
        assert_eq!(config.port, 8082);
    }
}
