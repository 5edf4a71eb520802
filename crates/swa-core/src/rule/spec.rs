//! Single-rule unit of work and its engine syntax.
//!
//! `RuleSpec` is built from an [`ExecutionRequest`] and turned into engine
//! syntax by [`RuleSpec::render`], the only place rule text is produced.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use swa_types::error::RuleError;
use swa_types::request::{ExecutionRequest, FileMapping, InputValue, OutputValue};

use crate::component;

/// Name of the synthesized rule.
pub const RULE_NAME: &str = "swa_run_wrapper";

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub name: String,
    pub inputs: FileMapping<InputValue>,
    pub outputs: FileMapping<OutputValue>,
    pub params: IndexMap<String, Value>,
    pub log: FileMapping<String>,
    pub threads: u32,
    pub resources: IndexMap<String, Value>,
    /// Omitted when zero.
    pub priority: i64,
    pub shadow: Option<String>,
    pub benchmark: Option<String>,
    /// Workdir-relative environment descriptor.
    pub conda: Option<String>,
    pub container: Option<String>,
    pub env_modules: Vec<String>,
    pub group: Option<String>,
    /// `file://` URL of the component directory.
    pub wrapper: String,
}

impl RuleSpec {
    /// Build the rule for `request`, with the component resolved below
    /// `wrappers_root`. `conda` is the descriptor copied into the workdir, if any.
    pub fn from_request(request: &ExecutionRequest, wrappers_root: &Path, conda: Option<String>) -> Self {
        let platform = &request.platform;
        let component_dir = component::resolve(wrappers_root, &request.component);
        Self {
            name: RULE_NAME.to_string(),
            inputs: request.inputs.clone().unwrap_or_default(),
            outputs: request.outputs.clone(),
            params: request.params.clone().unwrap_or_default(),
            log: platform.log.clone().unwrap_or_default(),
            threads: platform.threads.unwrap_or(1),
            resources: platform.resources.clone().unwrap_or_default(),
            priority: platform.priority.unwrap_or(0),
            shadow: platform.shadow_depth.clone(),
            benchmark: platform.benchmark.clone(),
            conda,
            container: platform.container_img.clone(),
            env_modules: platform.env_modules.clone().unwrap_or_default(),
            group: platform.group.clone(),
            wrapper: format!("file://{}", component_dir.display()),
        }
    }

    /// Engine targets: every output path, directories included.
    pub fn targets(&self) -> Vec<String> {
        self.outputs.values().into_iter().map(|o| o.path().to_string()).collect()
    }

    /// Render the rule in engine syntax.
    pub fn render(&self) -> Result<String, RuleError> {
        check_identifier(&self.name)?;
        let mut out = String::new();
        let _ = writeln!(out, "rule {}:", self.name);

        if !self.inputs.is_empty() {
            section(&mut out, "input", &self.inputs, |v| match v {
                InputValue::Path(p) => quote(p),
                InputValue::Paths(ps) => {
                    format!("[{}]", ps.iter().map(|p| quote(p)).collect::<Vec<_>>().join(", "))
                }
            })?;
        }
        section(&mut out, "output", &self.outputs, |v| match v {
            OutputValue::Path(p) => quote(p),
            OutputValue::Directory { directory } => format!("directory({})", quote(directory)),
        })?;
        if !self.params.is_empty() {
            keyword_section(&mut out, "params", &self.params)?;
        }
        if !self.log.is_empty() {
            section(&mut out, "log", &self.log, |v| quote(v))?;
        }
        let _ = writeln!(out, "    threads: {}", self.threads);
        if !self.resources.is_empty() {
            keyword_section(&mut out, "resources", &self.resources)?;
        }
        if self.priority != 0 {
            let _ = writeln!(out, "    priority: {}", self.priority);
        }
        if let Some(shadow) = &self.shadow {
            let _ = writeln!(out, "    shadow: {}", quote(shadow));
        }
        if let Some(benchmark) = &self.benchmark {
            let _ = writeln!(out, "    benchmark: {}", quote(benchmark));
        }
        if let Some(conda) = &self.conda {
            let _ = writeln!(out, "    conda: {}", quote(conda));
        }
        if let Some(container) = &self.container {
            let _ = writeln!(out, "    container: {}", quote(container));
        }
        if !self.env_modules.is_empty() {
            let _ = writeln!(out, "    envmodules:");
            for module in &self.env_modules {
                let _ = writeln!(out, "        {},", quote(module));
            }
        }
        if let Some(group) = &self.group {
            let _ = writeln!(out, "    group: {}", quote(group));
        }
        let _ = writeln!(out, "    wrapper:");
        let _ = writeln!(out, "        {}", quote(&self.wrapper));
        Ok(out)
    }
}

/// Whether `name` can be used as a rule name or keyword.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

fn check_identifier(key: &str) -> Result<(), RuleError> {
    if is_identifier(key) {
        Ok(())
    } else {
        Err(RuleError::InvalidKeyword(key.to_string()))
    }
}

fn section<V>(
    out: &mut String,
    directive: &str,
    mapping: &FileMapping<V>,
    render: impl Fn(&V) -> String,
) -> Result<(), RuleError> {
    let _ = writeln!(out, "    {directive}:");
    for (key, value) in mapping.entries() {
        match key {
            Some(key) => {
                check_identifier(key)?;
                let _ = writeln!(out, "        {key}={},", render(value));
            }
            None => {
                let _ = writeln!(out, "        {},", render(value));
            }
        }
    }
    Ok(())
}

fn keyword_section(out: &mut String, directive: &str, map: &IndexMap<String, Value>) -> Result<(), RuleError> {
    let _ = writeln!(out, "    {directive}:");
    for (key, value) in map {
        check_identifier(key)?;
        let _ = writeln!(out, "        {key}={},", python_literal(value));
    }
    Ok(())
}

/// Escaped string literal. JSON string escapes are valid engine-language escapes.
fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"))
}

/// Render a JSON value as an engine-language literal.
pub fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(python_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let items: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), python_literal(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
    }
}
