//! Demo compiler: self-test definition -> ready-to-submit demo calls.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use swa_types::request::WrapperSubmission;
use swa_types::rule::{DemoCall, RuleRecord};

use super::parser::RuleParser;
use crate::component;

/// Construct that delegates to a remotely resolved meta-wrapper.
const META_WRAPPER_DIRECTIVE: &str = "meta_wrapper:";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").expect("valid regex"));

/// Whether a path still contains an unresolved `{wildcard}`.
pub fn has_placeholder(value: &str) -> bool {
    PLACEHOLDER.is_match(value)
}

pub struct DemoCompiler<P: RuleParser> {
    parser: P,
}

impl<P: RuleParser> DemoCompiler<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    /// Compile the demos of `component_dir` from its self-test `definition`.
    ///
    /// Never fails: unreadable or unparsable definitions yield no demos.
    pub async fn compile(&self, definition: &Path, component_dir: &Path, components_root: &Path) -> Vec<DemoCall> {
        let content = match tokio::fs::read_to_string(definition).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(definition = %definition.display(), error = %e, "cannot read self-test definition");
                return Vec::new();
            }
        };
        if content.contains(META_WRAPPER_DIRECTIVE) {
            tracing::debug!(definition = %definition.display(), "meta-wrapper definition, no demos");
            return Vec::new();
        }

        let records = match self.parser.parse(definition).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(definition = %definition.display(), error = %e, "failed to parse self-test definition");
                return Vec::new();
            }
        };

        let workdir = definition.parent().map(Path::to_path_buf);
        records
            .into_iter()
            .filter(|r| r.is_leaf)
            .filter(|r| references(r, component_dir, components_root))
            .filter(|r| {
                let unresolved = r.file_values().into_iter().any(has_placeholder);
                if unresolved {
                    tracing::debug!(rule = %r.name, "skipping rule with unresolved placeholders");
                }
                !unresolved
            })
            .map(|mut r| {
                r.workdir = workdir.clone();
                DemoCall::tool_process(submission(r))
            })
            .collect()
    }
}

fn references(record: &RuleRecord, component_dir: &Path, components_root: &Path) -> bool {
    record.component.as_deref().is_some_and(|c| {
        component::same_location(&component::resolve(components_root, c), component_dir)
    })
}

fn submission(record: RuleRecord) -> WrapperSubmission {
    let component = record.component.unwrap_or_default();
    WrapperSubmission {
        wrapper_id: component::strip_legacy_prefix(&component).to_string(),
        inputs: (!record.inputs.is_empty()).then_some(record.inputs),
        outputs: Some(record.outputs),
        params: (!record.params.is_empty()).then_some(record.params),
        log: (!record.log.is_empty()).then_some(record.log),
        threads: Some(record.threads.unwrap_or(1)),
        workdir: record.workdir,
        timeout_secs: None,
    }
}
