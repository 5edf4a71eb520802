//! Rule dependency graph and leaf classification.
//!
//! Uses `petgraph` to model producer -> consumer edges between the rules of
//! one definition. An edge exists when one of a rule's inputs matches
//! another rule's output pattern, with `{wildcard}` segments matching any
//! non-empty text. Rules with no outgoing edges are leaves.

use petgraph::Direction;
use petgraph::graph::DiGraph;
use regex::Regex;
use swa_types::rule::RuleRecord;

// ---------------------------------------------------------------------------
// Output patterns
// ---------------------------------------------------------------------------

/// Compile an output path with `{wildcards}` into an anchored regex.
///
/// Returns `None` for patterns that cannot be compiled (unbalanced braces
/// produce a literal match instead).
pub fn output_pattern(output: &str) -> Option<Regex> {
    let mut pattern = String::from("^");
    let mut rest = output;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        pattern.push_str(&regex::escape(&rest[..open]));
        pattern.push_str(".+");
        rest = &rest[open + close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');
    Regex::new(&pattern).ok()
}

// ---------------------------------------------------------------------------
// Leaf classification
// ---------------------------------------------------------------------------

/// Set `is_leaf` on every record: true iff no other record consumes one of
/// its outputs. A single-record definition is trivially a leaf.
pub fn classify_leaves(records: &mut [RuleRecord]) {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<_> = (0..records.len()).map(|i| graph.add_node(i)).collect();

    let patterns: Vec<Vec<Regex>> = records
        .iter()
        .map(|r| {
            r.outputs
                .values()
                .into_iter()
                .filter_map(|o| output_pattern(o.path()))
                .collect()
        })
        .collect();

    for (consumer, record) in records.iter().enumerate() {
        let inputs: Vec<&str> = record.inputs.values().into_iter().flat_map(|v| v.paths()).collect();
        for (producer, outputs) in patterns.iter().enumerate() {
            if producer == consumer {
                continue;
            }
            let consumes = inputs.iter().any(|input| outputs.iter().any(|p| p.is_match(input)));
            if consumes {
                graph.update_edge(nodes[producer], nodes[consumer], ());
            }
        }
    }

    for (idx, record) in records.iter_mut().enumerate() {
        record.is_leaf = graph
            .neighbors_directed(nodes[idx], Direction::Outgoing)
            .next()
            .is_none();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(name: &str, inputs: serde_json::Value, outputs: serde_json::Value) -> RuleRecord {
        serde_json::from_value(json!({"name": name, "inputs": inputs, "outputs": outputs})).unwrap()
    }

    #[test]
    fn consumer_is_leaf_and_producer_is_not() {
        let mut records = vec![
            record("a", json!(["genome.fa"]), json!(["genome.fa.fai"])),
            record("b", json!({"idx": "genome.fa.fai"}), json!(["report.txt"])),
        ];
        classify_leaves(&mut records);
        assert!(!records[0].is_leaf);
        assert!(records[1].is_leaf);
    }

    #[test]
    fn wildcard_outputs_match_concrete_inputs() {
        let mut records = vec![
            record("sort", json!(["{sample}.bam"]), json!(["sorted/{sample}.bam"])),
            record("index", json!(["sorted/a.bam"]), json!(["sorted/a.bam.bai"])),
        ];
        classify_leaves(&mut records);
        assert!(!records[0].is_leaf);
        assert!(records[1].is_leaf);
    }

    #[test]
    fn single_rule_is_leaf() {
        let mut records = vec![record("only", json!(["x"]), json!(["x.out"]))];
        classify_leaves(&mut records);
        assert!(records[0].is_leaf);
    }

    #[test]
    fn independent_rules_are_all_leaves() {
        let mut records = vec![
            record("a", json!(["a.fa"]), json!(["a.fai"])),
            record("b", json!(["b.fa"]), json!(["b.fai"])),
        ];
        classify_leaves(&mut records);
        assert!(records.iter().all(|r| r.is_leaf));
    }

    #[test]
    fn output_pattern_escapes_literals() {
        let re = output_pattern("out/{sample}.fa.fai").unwrap();
        assert!(re.is_match("out/s1.fa.fai"));
        assert!(!re.is_match("out/s1XfaXfai"));
        assert!(!re.is_match("out/.fa.fai"));
        assert!(output_pattern("broken{").unwrap().is_match("broken{"));
    }
}
