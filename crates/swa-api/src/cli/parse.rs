//! `swa parse`: rebuild the wrapper metadata cache.

use anyhow::{Result, bail};
use console::style;

use swa_core::rule::{DemoCompiler, FallbackRuleParser, TextualRuleParser};
use swa_infra::filesystem::DataLayout;
use swa_infra::metadata::MetadataCache;
use swa_infra::metadata::scan::build_cache;
use swa_infra::reflect::EngineReflectionParser;
use swa_types::config::ServerConfig;

use crate::state::wrappers_root;

/// Scan the wrapper repository and rewrite the cache under `<data_dir>/parser`.
///
/// Rules are read through the engine's loader when it is importable and
/// through the textual parser otherwise.
pub async fn parse(config: &ServerConfig, layout: &DataLayout, json: bool) -> Result<()> {
    let root = wrappers_root(config, layout);
    if !tokio::fs::metadata(&root).await.is_ok_and(|m| m.is_dir()) {
        bail!("wrappers path {} is not a directory (set --wrappers-path)", root.display());
    }

    let cache = MetadataCache::new(layout.cache_dir());
    let parser = FallbackRuleParser::new(
        EngineReflectionParser::new(&config.engine.python),
        TextualRuleParser::new(),
    );
    let report = build_cache(&root, &cache, &DemoCompiler::new(parser)).await?;

    if json {
        let summary = serde_json::json!({
            "wrappers": report.wrappers,
            "demos": report.demos,
            "failures": report
                .failures
                .iter()
                .map(|(id, error)| serde_json::json!({"wrapper": id, "error": error}))
                .collect::<Vec<_>>(),
            "cache_dir": cache.dir().display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Cached {} wrappers with {} demos",
        style("✓").green().bold(),
        style(report.wrappers).bold(),
        style(report.demos).bold()
    );
    println!("  {}", style(cache.dir().display()).dim());
    if !report.failures.is_empty() {
        println!();
        println!(
            "  {} {} wrappers could not be read:",
            style("!").yellow().bold(),
            report.failures.len()
        );
        for (id, error) in &report.failures {
            println!("    {} {}: {}", style("•").dim(), style(id).cyan(), error);
        }
    }
    println!();

    Ok(())
}
