//! Wrapper and workflow metadata as kept in the metadata cache.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::PlatformParams;
use crate::rule::DemoCall;

/// Descriptive information from a wrapper's `meta.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrapperInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    /// Notes, one entry per non-blank line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
}

/// User-facing parameter documentation. `meta.yaml` is loosely typed, so the
/// values are kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// One cache entry per wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperMetadata {
    /// Path relative to the wrappers root, e.g. `bio/samtools/faidx`.
    pub id: String,
    pub info: WrapperInfo,
    #[serde(default)]
    pub user_params: UserParams,
    #[serde(default)]
    pub platform_params: PlatformParams,
    #[serde(default)]
    pub demos: Vec<DemoCall>,
}

impl WrapperMetadata {
    pub fn summary(&self) -> WrapperSummary {
        WrapperSummary {
            id: self.id.clone(),
            info: self.info.clone(),
            user_params: self.user_params.clone(),
        }
    }
}

/// Public view of a wrapper: platform params and demos are withheld.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperSummary {
    pub id: String,
    pub info: WrapperInfo,
    pub user_params: UserParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListWrappersResponse {
    pub wrappers: Vec<WrapperSummary>,
    pub total_count: usize,
}

/// A workflow directory found under the workflows root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub id: String,
    /// Entry point relative to the workflow directory.
    pub snakefile: String,
    pub has_config: bool,
    /// Profiles local to the workflow.
    #[serde(default)]
    pub profiles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListWorkflowsResponse {
    pub workflows: Vec<WorkflowInfo>,
    pub total_count: usize,
}
