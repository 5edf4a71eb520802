//! Rule records extracted from self-test definitions, and the demo
//! payloads compiled from them.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::{FileMapping, InputValue, OutputValue, WrapperSubmission};

/// One rule as seen by a rule parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub name: String,
    #[serde(default)]
    pub inputs: FileMapping<InputValue>,
    #[serde(default)]
    pub outputs: FileMapping<OutputValue>,
    #[serde(default)]
    pub params: IndexMap<String, Value>,
    #[serde(default)]
    pub log: FileMapping<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
    #[serde(default)]
    pub resources: IndexMap<String, Value>,
    /// Component referenced by the rule's `wrapper:` directive, as written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// No other rule in the same definition consumes this rule's outputs.
    #[serde(default)]
    pub is_leaf: bool,
    /// Set by the compiler to the self-test directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
}

impl RuleRecord {
    /// Every input and output path string of the rule.
    pub fn file_values(&self) -> Vec<&str> {
        let inputs = self.inputs.values().into_iter().flat_map(|v| v.paths());
        let outputs = self.outputs.values().into_iter().map(|v| v.path());
        inputs.chain(outputs).collect()
    }
}

/// A ready-to-replay submission: HTTP method, endpoint and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoCall {
    pub method: String,
    pub endpoint: String,
    pub payload: WrapperSubmission,
}

impl DemoCall {
    pub const METHOD: &'static str = "POST";
    pub const ENDPOINT: &'static str = "/tool-processes";

    pub fn tool_process(payload: WrapperSubmission) -> Self {
        Self {
            method: Self::METHOD.to_string(),
            endpoint: Self::ENDPOINT.to_string(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_flattens_inputs_and_outputs() {
        let record: RuleRecord = serde_json::from_value(serde_json::json!({
            "name": "test",
            "inputs": {"reads": ["a.fq", "b.fq"]},
            "outputs": [{"directory": "idx"}, "out.bam"],
        }))
        .unwrap();
        assert_eq!(record.file_values(), vec!["a.fq", "b.fq", "idx", "out.bam"]);
    }

    #[test]
    fn demo_call_targets_tool_processes() {
        let call = DemoCall::tool_process(WrapperSubmission {
            wrapper_id: "bio/samtools/faidx".into(),
            ..Default::default()
        });
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["endpoint"], "/tool-processes");
        assert_eq!(json["payload"]["wrapper_id"], "bio/samtools/faidx");
    }
}
