//! Line-oriented rule parser.
//!
//! Recognizes `rule <name>:` blocks and their indented directive sections.
//! It does not evaluate the rule language, so only literal values survive;
//! function calls such as `expand(...)` are kept verbatim as strings. Leaf
//! flags come from [`super::graph::classify_leaves`].

use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use swa_types::error::RuleError;
use swa_types::request::{FileMapping, InputValue, OutputValue};
use swa_types::rule::RuleRecord;

use super::graph::classify_leaves;
use super::parser::RuleParser;
use crate::component;

static RULE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^rule\s+(\w+)\s*:").expect("valid regex"));

static SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s+(input|output|params|log|wrapper|threads|conda|singularity|container|benchmark|shadow|resources|version|message|priority|wildcard_constraints|group|envmodules|localrule|retries|default_target|cache|handover)\s*:\s*(.*)$",
    )
    .expect("valid regex")
});

static KEYWORD_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\s*=\s*(.*)$").expect("valid regex"));

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("valid regex"));

static DIRECTORY_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^directory\(\s*["']([^"']*)["']\s*\)$"#).expect("valid regex"));

/// Parser that needs nothing but the definition text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextualRuleParser;

impl TextualRuleParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse definition text into records with leaf flags set.
    pub fn parse_str(&self, content: &str) -> Vec<RuleRecord> {
        let mut records = Vec::new();
        let mut current: Option<Draft> = None;
        let mut section: Option<String> = None;

        for raw in content.lines() {
            let line = raw.trim_end();

            if let Some(caps) = RULE_HEADER.captures(line) {
                if let Some(done) = current.take() {
                    records.push(done.finish());
                }
                current = Some(Draft::new(&caps[1]));
                section = None;
                continue;
            }

            let Some(rule) = current.as_mut() else {
                continue;
            };

            if let Some(caps) = SECTION.captures(line) {
                let name = caps[1].to_string();
                let inline = caps[2].trim();
                if !inline.is_empty() && !inline.starts_with('#') {
                    rule.add(&name, inline);
                }
                section = Some(name);
                continue;
            }

            let content = line.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }
            if !line.starts_with([' ', '\t']) {
                // Top-level statement: the rule body has ended.
                section = None;
                continue;
            }
            if let Some(name) = &section {
                rule.add(name, content);
            }
        }
        if let Some(done) = current.take() {
            records.push(done.finish());
        }

        classify_leaves(&mut records);
        records
    }
}

impl RuleParser for TextualRuleParser {
    async fn parse(&self, definition: &Path) -> Result<Vec<RuleRecord>, RuleError> {
        let content = tokio::fs::read_to_string(definition).await?;
        Ok(self.parse_str(&content))
    }
}

/// Accumulates one rule's sections. Positional values are dropped as soon
/// as the section turns out to hold keyword entries.
#[derive(Default)]
struct Draft {
    name: String,
    inputs: Entries,
    outputs: Entries,
    log: Entries,
    params: IndexMap<String, Value>,
    resources: IndexMap<String, Value>,
    threads: Option<u32>,
    component: Option<String>,
}

#[derive(Default)]
struct Entries {
    named: IndexMap<String, String>,
    positional: Vec<String>,
}

impl Entries {
    fn push(&mut self, content: &str) {
        match KEYWORD_ENTRY.captures(content) {
            Some(caps) => {
                self.positional.clear();
                self.named.insert(caps[1].to_string(), clean_value(&caps[2]));
            }
            None if self.named.is_empty() => {
                let value = clean_value(content);
                if !value.is_empty() {
                    self.positional.push(value);
                }
            }
            None => {}
        }
    }

    fn into_mapping<V>(self, convert: impl Fn(String) -> V) -> FileMapping<V> {
        if self.named.is_empty() {
            FileMapping::Positional(self.positional.into_iter().map(convert).collect())
        } else {
            FileMapping::Named(self.named.into_iter().map(|(k, v)| (k, convert(v))).collect())
        }
    }
}

impl Draft {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn add(&mut self, section: &str, content: &str) {
        match section {
            "input" => self.inputs.push(content),
            "output" => self.outputs.push(content),
            "log" => self.log.push(content),
            "params" => keyword_value(&mut self.params, content),
            "resources" => keyword_value(&mut self.resources, content),
            "threads" => {
                let value = clean_value(content);
                let value = value.rsplit('=').next().unwrap_or(&value).trim();
                self.threads = value.parse().ok();
            }
            "wrapper" => {
                if let Some(caps) = QUOTED.captures(content) {
                    self.component = Some(component::strip_legacy_prefix(&caps[1]).to_string());
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> RuleRecord {
        RuleRecord {
            name: self.name,
            inputs: self.inputs.into_mapping(InputValue::Path),
            outputs: self.outputs.into_mapping(output_value),
            params: self.params,
            log: self.log.into_mapping(|v| v),
            threads: self.threads,
            resources: self.resources,
            component: self.component,
            is_leaf: false,
            workdir: None,
        }
    }
}

fn output_value(raw: String) -> OutputValue {
    match DIRECTORY_CALL.captures(&raw) {
        Some(caps) => OutputValue::Directory {
            directory: caps[1].to_string(),
        },
        None => OutputValue::Path(raw),
    }
}

fn keyword_value(map: &mut IndexMap<String, Value>, content: &str) {
    if let Some(caps) = KEYWORD_ENTRY.captures(content) {
        map.insert(caps[1].to_string(), literal_value(&caps[2]));
    }
}

/// Strip a trailing comma and one level of surrounding quotes.
fn clean_value(value: &str) -> String {
    let value = value.trim().trim_end_matches(',').trim();
    unquote(value).unwrap_or(value).to_string()
}

fn unquote(value: &str) -> Option<&str> {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return Some(&value[1..value.len() - 1]);
        }
    }
    None
}

/// Interpret a param/resource value. Quoted strings stay strings; other
/// literals are read as YAML (numbers, booleans, flow lists and mappings);
/// anything unrecognized is kept as its source text.
fn literal_value(raw: &str) -> Value {
    let raw = raw.trim().trim_end_matches(',').trim();
    if let Some(inner) = unquote(raw) {
        return Value::String(inner.to_string());
    }
    match raw {
        "True" => return Value::Bool(true),
        "False" => return Value::Bool(false),
        "None" => return Value::Null,
        _ => {}
    }
    match serde_yaml_ng::from_str::<Value>(raw) {
        Ok(Value::Object(map)) if raw.starts_with('{') => Value::Object(map),
        Ok(Value::Object(_)) | Ok(Value::Null) | Err(_) => Value::String(raw.to_string()),
        Ok(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const FAIDX: &str = r#"
rule samtools_faidx:
    input:
        "{sample}.fa",
    output:
        "out/{sample}.fa.fai",
    log:
        "{sample}.log",
    params:
        extra="",
    wrapper:
        "master/bio/samtools/faidx"


rule samtools_faidx_bgzip:
    input:
        "{sample}.fa.bgz",
    output:
        fai="out/{sample}.fas.bgz.fai",
        gzi="out/{sample}.fas.bgz.gzi",
    log:
        "{sample}.bzgip.log",
    params:
        extra="",
    wrapper:
        "master/bio/samtools/faidx"
"#;

    #[test]
    fn parses_rule_blocks() {
        let records = TextualRuleParser::new().parse_str(FAIDX);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.name, "samtools_faidx");
        assert_eq!(first.component.as_deref(), Some("bio/samtools/faidx"));
        assert_eq!(first.inputs, FileMapping::Positional(vec![InputValue::from("{sample}.fa")]));
        assert_eq!(first.params.get("extra"), Some(&json!("")));

        let second = &records[1];
        let keys: Vec<_> = second.outputs.entries().into_iter().filter_map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["fai", "gzi"]);
        assert_eq!(second.log.values(), vec!["{sample}.bzgip.log"]);
    }

    #[test]
    fn inline_values_and_threads() {
        let records = TextualRuleParser::new().parse_str(
            "rule bwa:\n    input: \"ref.fa\"\n    output: \"ref.fa.bwt\"\n    threads: 8\n    wrapper: \"master/bio/bwa/index\"\n",
        );
        let rule = &records[0];
        assert_eq!(rule.threads, Some(8));
        assert_eq!(rule.inputs.values()[0].paths(), vec!["ref.fa"]);
        assert_eq!(rule.outputs.values()[0].path(), "ref.fa.bwt");
        assert_eq!(rule.component.as_deref(), Some("bio/bwa/index"));
    }

    #[test]
    fn non_literal_threads_is_none() {
        let records = TextualRuleParser::new().parse_str(
            "rule a:\n    output: \"x\"\n    threads: workflow.cores\n",
        );
        assert_eq!(records[0].threads, None);
    }

    #[test]
    fn named_entries_drop_positional_ones() {
        let records = TextualRuleParser::new().parse_str(
            "rule a:\n    input:\n        \"plain.txt\",\n        ref=\"genome.fa\",\n        \"after.txt\",\n    output: \"x\"\n",
        );
        let inputs = &records[0].inputs;
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs.entries()[0].0, Some("ref"));
    }

    #[test]
    fn directory_outputs_are_recognized() {
        let records = TextualRuleParser::new().parse_str(
            "rule idx:\n    output:\n        idx=directory(\"index\"),\n    wrapper: \"master/bio/star/index\"\n",
        );
        let out = records[0].outputs.values()[0].clone();
        assert_eq!(out, OutputValue::Directory { directory: "index".into() });
    }

    #[test]
    fn param_literals() {
        let records = TextualRuleParser::new().parse_str(
            "rule p:\n    output: \"x\"\n    params:\n        n=3,\n        flag=True,\n        quoted=\"3\",\n        opts=[\"-a\", \"-b\"],\n        cb=lambda w: w.sample,\n    resources:\n        mem_mb=2048,\n",
        );
        let params = &records[0].params;
        assert_eq!(params["n"], json!(3));
        assert_eq!(params["flag"], json!(true));
        assert_eq!(params["quoted"], json!("3"));
        assert_eq!(params["opts"], json!(["-a", "-b"]));
        assert_eq!(params["cb"], json!("lambda w: w.sample"));
        assert_eq!(records[0].resources["mem_mb"], json!(2048));
    }

    #[test]
    fn comments_and_top_level_code_are_ignored() {
        let records = TextualRuleParser::new().parse_str(
            "import os\n\nrule a:\n    # leading comment\n    output:\n        # inner comment\n        \"a.txt\",\n\nconfigfile: \"config.yaml\"\n    \"stray.txt\",\n",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outputs.len(), 1);
    }

    #[tokio::test]
    async fn parses_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Snakefile");
        std::fs::write(&path, FAIDX).unwrap();
        let records = TextualRuleParser::new().parse(&path).await.unwrap();
        assert_eq!(records.len(), 2);

        let missing = TextualRuleParser::new().parse(&dir.path().join("nope")).await;
        assert!(matches!(missing, Err(RuleError::Io(_))));
    }
}
