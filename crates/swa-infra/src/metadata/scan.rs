//! Wrapper repository scan feeding the metadata cache.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use swa_core::component;
use swa_core::rule::{DemoCompiler, RuleParser};
use swa_types::error::MetadataError;
use swa_types::metadata::{UserParams, WrapperInfo, WrapperMetadata};
use swa_types::request::PlatformParams;
use walkdir::WalkDir;

use super::MetadataCache;

pub const META_FILE: &str = "meta.yaml";

/// Self-test definition relative to a wrapper directory.
pub const SELF_TEST: &str = "test/Snakefile";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanReport {
    pub wrappers: usize,
    pub demos: usize,
    /// `(wrapper id, error)` for wrappers that could not be cached.
    pub failures: Vec<(String, String)>,
}

/// Directories below `root` holding a `meta.yaml`. Hidden directories are
/// not descended into.
pub fn find_wrapper_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.file_name() == META_FILE)
        .filter_map(|e| e.path().parent().map(Path::to_path_buf))
        .collect();
    dirs.sort();
    dirs
}

/// Rebuild the cache from the wrapper repository at `root`.
///
/// The cache is cleared first. A wrapper that fails to parse is reported
/// and skipped; the scan itself fails only on cache I/O errors.
pub async fn build_cache<P: RuleParser>(
    root: &Path,
    cache: &MetadataCache,
    compiler: &DemoCompiler<P>,
) -> Result<ScanReport, MetadataError> {
    cache.clear().await?;

    let walk_root = root.to_path_buf();
    let dirs = tokio::task::spawn_blocking(move || find_wrapper_dirs(&walk_root))
        .await
        .map_err(|e| MetadataError::Io(std::io::Error::other(e)))?;

    let mut report = ScanReport::default();
    for dir in dirs {
        let Some(id) = component::relative_id(root, &dir) else {
            continue;
        };
        let mut meta = match read_wrapper(&id, &dir).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(wrapper = %id, error = %e, "failed to read wrapper metadata");
                report.failures.push((id, e.to_string()));
                continue;
            }
        };

        let definition = dir.join(SELF_TEST);
        if tokio::fs::try_exists(&definition).await.unwrap_or(false) {
            meta.demos = compiler.compile(&definition, &dir, root).await;
        }
        report.demos += meta.demos.len();
        report.wrappers += 1;
        tracing::debug!(wrapper = %id, demos = meta.demos.len(), "cached wrapper");
        cache.store(&meta).await?;
    }

    tracing::info!(wrappers = report.wrappers, demos = report.demos, cache = %cache.dir().display(), "metadata cache rebuilt");
    Ok(report)
}

/// Build the cache entry for one wrapper from its `meta.yaml`.
pub async fn read_wrapper(id: &str, dir: &Path) -> Result<WrapperMetadata, MetadataError> {
    let path = dir.join(META_FILE);
    let content = tokio::fs::read_to_string(&path).await?;
    let meta: Value =
        serde_yaml_ng::from_str(&content).map_err(|e| MetadataError::Malformed(format!("{}: {e}", path.display())))?;
    if !meta.is_object() {
        return Err(MetadataError::Malformed(format!("{} is not a mapping", path.display())));
    }

    let fallback_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.to_string());

    let info = WrapperInfo {
        name: field::<String>(&meta, "name").unwrap_or(fallback_name),
        description: field(&meta, "description"),
        url: field(&meta, "url"),
        authors: lines_or_list(meta.get("authors")),
        notes: lines_or_list(meta.get("notes")),
    };
    let user_params = UserParams {
        inputs: meta.get("input").cloned(),
        outputs: meta.get("output").cloned(),
        params: meta.get("params").cloned(),
    };
    let platform_params = PlatformParams {
        log: field(&meta, "log"),
        threads: field(&meta, "threads"),
        resources: field(&meta, "resources"),
        priority: field(&meta, "priority"),
        shadow_depth: field(&meta, "shadow_depth"),
        benchmark: field(&meta, "benchmark"),
        container_img: field(&meta, "container_img"),
        conda_env: field(&meta, "conda_env"),
        env_modules: field(&meta, "env_modules"),
        group: field(&meta, "group"),
    };

    Ok(WrapperMetadata {
        id: id.to_string(),
        info,
        user_params,
        platform_params,
        demos: Vec::new(),
    })
}

/// Typed view of `meta[key]`; mistyped values are treated as absent.
fn field<T: DeserializeOwned>(meta: &Value, key: &str) -> Option<T> {
    let value = meta.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!(key, error = %e, "ignoring mistyped meta.yaml field");
            None
        }
    }
}

/// A multi-line string becomes its non-blank lines; a list keeps its items.
fn lines_or_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value? {
        Value::String(s) => Some(
            s.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        _ => None,
    }
}
