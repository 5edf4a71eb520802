//! Rule parsing through the engine's own loader.
//!
//! An embedded Python script loads the definition with the engine's
//! `Workflow` API and prints one JSON document describing every rule,
//! including a leaf flag computed from the engine's producer matching.

use std::path::Path;
use std::time::Duration;

use swa_core::component;
use swa_core::job::ProcessTracker;
use swa_core::rule::RuleParser;
use swa_types::error::RuleError;
use swa_types::rule::RuleRecord;

use crate::engine::{EngineCommand, OutputSink, ProcessOutcome, run_engine};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const REFLECT_SCRIPT: &str = r#"
import json
import os
import sys

from snakemake.io import is_flagged
from snakemake.settings import types as st
from snakemake.workflow import Workflow

path = os.path.abspath(sys.argv[1])
os.chdir(os.path.dirname(path))

workflow = Workflow(
    config_settings=st.ConfigSettings(),
    resource_settings=st.ResourceSettings(),
    workflow_settings=st.WorkflowSettings(),
    storage_settings=st.StorageSettings(),
    deployment_settings=st.DeploymentSettings(),
    execution_settings=st.ExecutionSettings(),
    scheduling_settings=st.SchedulingSettings(),
    output_settings=st.OutputSettings(),
    dag_settings=st.DAGSettings(),
)
workflow.include(path, overwrite_default_target=True)


def value(f, output):
    if output and is_flagged(f, "directory"):
        return {"directory": str(f)}
    return str(f)


def files(items, output=False):
    names = getattr(items, "_names", None) or {}
    if not names:
        return [value(f, output) for f in items if isinstance(f, str)]
    out = {}
    for name, (start, end) in names.items():
        if end is None:
            if isinstance(items[start], str):
                out[name] = value(items[start], output)
        else:
            out[name] = [str(f) for f in items[start:end] if isinstance(f, str)]
    return out


def params(items):
    names = getattr(items, "_names", None) or {}
    return {name: getattr(items, name) for name in names}


rules = list(workflow.rules)


def consumed(rule):
    for other in rules:
        if other is rule:
            continue
        for f in other.input:
            if isinstance(f, str) and rule.is_producer(f):
                return True
    return False


records = []
for rule in rules:
    cores = rule.resources.get("_cores")
    records.append({
        "name": rule.name,
        "inputs": files(rule.input),
        "outputs": files(rule.output, output=True),
        "params": params(rule.params),
        "log": files(rule.log),
        "threads": cores if isinstance(cores, int) else None,
        "resources": {
            k: v for k, v in rule.resources.items()
            if not k.startswith("_") and isinstance(v, (int, float, str))
        },
        "component": rule.wrapper,
        "is_leaf": not consumed(rule),
    })

print(json.dumps(records, default=str))
"#;

#[derive(Debug, Clone)]
pub struct EngineReflectionParser {
    python: String,
    timeout: Duration,
}

impl EngineReflectionParser {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl RuleParser for EngineReflectionParser {
    async fn parse(&self, definition: &Path) -> Result<Vec<RuleRecord>, RuleError> {
        let command = EngineCommand::new(&self.python)
            .arg("-c")
            .arg(REFLECT_SCRIPT)
            .arg(definition);
        let out = run_engine(&command, &OutputSink::Capture, self.timeout, &ProcessTracker::detached())
            .await
            .map_err(|e| RuleError::Reflection(format!("cannot run {}: {e}", self.python)))?;
        match out.outcome {
            ProcessOutcome::Exited(0) => decode(&out.stdout),
            ProcessOutcome::Exited(code) => Err(RuleError::Reflection(format!(
                "loader exited with code {code}: {}",
                last_line(&out.stderr)
            ))),
            ProcessOutcome::TimedOut => Err(RuleError::Reflection(format!(
                "loader timed out after {} seconds",
                self.timeout.as_secs()
            ))),
            ProcessOutcome::Cancelled => Err(RuleError::Reflection("loader cancelled".into())),
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

/// Decode the loader's report: the last non-empty stdout line, since the
/// engine may print banners before it.
fn decode(stdout: &str) -> Result<Vec<RuleRecord>, RuleError> {
    let line = last_line(stdout);
    let mut records: Vec<RuleRecord> =
        serde_json::from_str(line).map_err(|e| RuleError::Reflection(format!("unreadable loader output: {e}")))?;
    for record in &mut records {
        if let Some(c) = record.component.as_mut() {
            *c = component::strip_legacy_prefix(c).to_string();
        }
    }
    Ok(records)
}
