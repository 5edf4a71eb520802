//! Execution request types.
//!
//! `ExecutionRequest` is the normalized unit of work handed to the wrapper
//! driver. `WrapperSubmission` and `WorkflowSubmission` are the user-facing
//! payloads accepted by the submission API (and emitted as demo payloads).

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ServerConfig;
use crate::job::JobId;

// ---------------------------------------------------------------------------
// File mappings
// ---------------------------------------------------------------------------

/// Named or positional mapping of rule files.
///
/// On the wire this is either a JSON object (`{"fai": "genome.fa.fai"}`)
/// or a JSON array (`["genome.fa.fai"]`). Named mappings keep insertion
/// order, since the engine exposes them positionally as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileMapping<V> {
    Named(IndexMap<String, V>),
    Positional(Vec<V>),
}

impl<V> Default for FileMapping<V> {
    fn default() -> Self {
        FileMapping::Positional(Vec::new())
    }
}

impl<V> FileMapping<V> {
    pub fn len(&self) -> usize {
        match self {
            FileMapping::Named(map) => map.len(),
            FileMapping::Positional(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All values in declaration order.
    pub fn values(&self) -> Vec<&V> {
        match self {
            FileMapping::Named(map) => map.values().collect(),
            FileMapping::Positional(list) => list.iter().collect(),
        }
    }

    /// `(key, value)` pairs in declaration order; positional entries have no key.
    pub fn entries(&self) -> Vec<(Option<&str>, &V)> {
        match self {
            FileMapping::Named(map) => map.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
            FileMapping::Positional(list) => list.iter().map(|v| (None, v)).collect(),
        }
    }
}

/// A rule input: one path or a list of paths bound to the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Path(String),
    Paths(Vec<String>),
}

impl InputValue {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            InputValue::Path(p) => vec![p.as_str()],
            InputValue::Paths(ps) => ps.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        InputValue::Path(s.to_string())
    }
}

/// A rule output: a file, or a directory (`{"directory": "out/"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Path(String),
    Directory { directory: String },
}

impl OutputValue {
    pub fn path(&self) -> &str {
        match self {
            OutputValue::Path(p) => p,
            OutputValue::Directory { directory } => directory,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, OutputValue::Directory { .. })
    }
}

impl From<&str> for OutputValue {
    fn from(s: &str) -> Self {
        OutputValue::Path(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Platform parameters
// ---------------------------------------------------------------------------

/// Hidden execution parameters filled in from the metadata cache.
///
/// End users never supply these directly; demo payloads may carry `log`
/// and `threads`, which take precedence over the cached values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<FileMapping<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<IndexMap<String, Value>>,
    /// Zero and absent are equivalent (directive omitted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_depth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_img: Option<String>,
    /// Environment descriptor file name relative to the component directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conda_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_modules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalized wrapper request
// ---------------------------------------------------------------------------

/// The normalized single-step unit of work.
///
/// `outputs` must be non-empty: the engine is driven by requested output
/// targets, so a request without outputs cannot be executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Component path relative to the wrappers root (e.g. `bio/samtools/faidx`).
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<FileMapping<InputValue>>,
    pub outputs: FileMapping<OutputValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IndexMap<String, Value>>,
    #[serde(default)]
    pub platform: PlatformParams,
    /// Working directory exclusively owned by this request.
    pub workdir: PathBuf,
}

// ---------------------------------------------------------------------------
// Submission payloads
// ---------------------------------------------------------------------------

/// Payload of `POST /tool-processes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrapperSubmission {
    pub wrapper_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<FileMapping<InputValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<FileMapping<OutputValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<IndexMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<FileMapping<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
    /// Directory whose contents seed the job's private working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl WrapperSubmission {
    /// Build the normalized request, filling hidden parameters from the
    /// cached `platform` values. A `log` or `threads` carried by the
    /// submission wins over the cached one; missing outputs become an empty
    /// mapping, which the driver rejects.
    pub fn into_request(self, platform: &PlatformParams, workdir: PathBuf) -> ExecutionRequest {
        let mut platform = platform.clone();
        if self.log.is_some() {
            platform.log = self.log;
        }
        if self.threads.is_some() {
            platform.threads = self.threads;
        }
        ExecutionRequest {
            component: self.wrapper_id,
            inputs: self.inputs,
            outputs: self.outputs.unwrap_or_default(),
            params: self.params,
            platform,
            workdir,
        }
    }
}

/// Whether (and how strictly) to upload the execution directory to the
/// profile's remote storage prefix before running a workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefillMode {
    #[default]
    Off,
    /// Upload failures are logged and the run proceeds.
    BestEffort,
    /// Upload failures abort the run with a failed result.
    Required,
}

/// Core count handed to the engine: a number or a keyword such as `all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoreCount {
    Count(u32),
    Keyword(String),
}

impl Default for CoreCount {
    fn default() -> Self {
        CoreCount::Keyword("all".to_string())
    }
}

impl fmt::Display for CoreCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreCount::Count(n) => write!(f, "{n}"),
            CoreCount::Keyword(k) => write!(f, "{k}"),
        }
    }
}

/// Payload of `POST /workflow-processes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSubmission {
    pub workflow_id: String,
    /// Configuration overrides deep-merged onto the workflow's base config.
    #[serde(default)]
    pub config: serde_json::Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<CoreCount>,
    #[serde(default = "default_use_conda")]
    pub use_conda: bool,
    /// Named execution profile; falls back to the server default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefill: Option<PrefillMode>,
    /// Run in an isolated per-job directory instead of the workflow source tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_use_conda() -> bool {
    true
}

/// Normalized multi-step unit of work handed to the workflow driver.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRequest {
    pub workflow_id: String,
    pub config_overrides: serde_json::Map<String, Value>,
    pub target_rule: Option<String>,
    pub cores: CoreCount,
    pub use_conda: bool,
    pub profile: Option<String>,
    pub prefill: PrefillMode,
    pub isolate: bool,
    /// When present, output is streamed to the per-job log file.
    pub job_id: Option<JobId>,
}

impl WorkflowSubmission {
    /// Normalize against the server defaults for profile, prefill and isolation.
    pub fn into_request(self, defaults: &ServerConfig, job_id: Option<JobId>) -> WorkflowRequest {
        WorkflowRequest {
            workflow_id: self.workflow_id,
            config_overrides: self.config,
            target_rule: self.target_rule,
            cores: self.cores.unwrap_or_default(),
            use_conda: self.use_conda,
            profile: self.profile.or_else(|| defaults.workflow_profile.clone()),
            prefill: self.prefill.unwrap_or(defaults.prefill),
            isolate: self.isolate.unwrap_or(defaults.workflow.isolate),
            job_id,
        }
    }
}
