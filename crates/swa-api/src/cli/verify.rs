//! `swa verify`: execute cached demo payloads directly through the wrapper
//! driver, without going through the job registry.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Serialize;

use swa_core::component;
use swa_core::job::ProcessTracker;
use swa_infra::engine::WrapperDriver;
use swa_infra::filesystem::DataLayout;
use swa_infra::fsutil::prepare_job_workdir;
use swa_infra::metadata::MetadataCache;
use swa_types::config::ServerConfig;
use swa_types::metadata::WrapperMetadata;
use swa_types::result::ExecutionResult;

use crate::state::wrapper_driver;

#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub include: Vec<String>,
    pub dry_run: bool,
    pub fast_fail: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DemoOutcome {
    pub wrapper: String,
    pub demo: usize,
    pub success: bool,
    pub exit_code: i32,
    pub error: Option<String>,
    pub elapsed_ms: u128,
    /// Kept for inspection when the demo failed.
    pub workdir: Option<PathBuf>,
}

pub async fn verify(config: &ServerConfig, layout: &DataLayout, options: &VerifyOptions, json: bool) -> Result<()> {
    let cache = MetadataCache::new(layout.cache_dir());
    let wrappers = select(cache.list().await?, &options.include);
    let total: usize = wrappers.iter().map(|w| w.demos.len()).sum();

    if total == 0 {
        println!();
        println!(
            "  {} No demos found. Build the cache with: {}",
            style("i").blue().bold(),
            style("swa parse").yellow()
        );
        println!();
        return Ok(());
    }

    if options.dry_run {
        print_plan(&wrappers, json)?;
        return Ok(());
    }

    let driver = wrapper_driver(config, layout);
    let timeout = Duration::from_secs(config.wrapper_timeout_secs);
    let outcomes = run_demos(&driver, &wrappers, timeout, options.fast_fail).await?;
    let failed = outcomes.iter().filter(|o| !o.success).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        print_outcomes(&outcomes, total);
    }

    if failed > 0 {
        bail!("{failed} of {} demos failed", outcomes.len());
    }
    Ok(())
}

/// Wrappers named in `include` (all of them when empty).
fn select(wrappers: Vec<WrapperMetadata>, include: &[String]) -> Vec<WrapperMetadata> {
    if include.is_empty() {
        return wrappers;
    }
    let wanted: Vec<&str> = include.iter().map(|i| component::strip_legacy_prefix(i.trim_matches('/'))).collect();
    wrappers.into_iter().filter(|w| wanted.contains(&w.id.as_str())).collect()
}

/// Run every demo in a private copy of its working directory.
pub async fn run_demos(
    driver: &WrapperDriver,
    wrappers: &[WrapperMetadata],
    timeout: Duration,
    fast_fail: bool,
) -> Result<Vec<DemoOutcome>> {
    let mut outcomes = Vec::new();
    for wrapper in wrappers {
        for (index, demo) in wrapper.demos.iter().enumerate() {
            let workdir = prepare_job_workdir(demo.payload.workdir.as_deref()).await?;
            let request = demo.payload.clone().into_request(&wrapper.platform_params, workdir.clone());

            tracing::info!(wrapper = %wrapper.id, demo = index, workdir = %workdir.display(), "running demo");
            let started = Instant::now();
            let result = match driver.execute(&request, timeout, &ProcessTracker::detached()).await {
                Ok(result) => result,
                Err(e) => ExecutionResult::exception(format!("{e:#}")),
            };
            let elapsed_ms = started.elapsed().as_millis();

            let success = result.is_success();
            if success {
                if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
                    tracing::warn!(workdir = %workdir.display(), error = %e, "failed to remove demo workdir");
                }
            } else {
                tracing::warn!(wrapper = %wrapper.id, demo = index, exit_code = result.exit_code, "demo failed");
            }
            outcomes.push(DemoOutcome {
                wrapper: wrapper.id.clone(),
                demo: index,
                success,
                exit_code: result.exit_code,
                error: result.error_message,
                elapsed_ms,
                workdir: (!success).then_some(workdir),
            });

            if !success && fast_fail {
                return Ok(outcomes);
            }
        }
    }
    Ok(outcomes)
}

fn print_plan(wrappers: &[WrapperMetadata], json: bool) -> Result<()> {
    let plan: Vec<_> = wrappers
        .iter()
        .flat_map(|w| w.demos.iter().enumerate().map(move |(i, d)| (w.id.as_str(), i, d)))
        .collect();

    if json {
        let rows: Vec<_> = plan
            .iter()
            .map(|(id, i, d)| serde_json::json!({"wrapper": id, "demo": i, "payload": d.payload}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Wrapper").fg(Color::White),
        Cell::new("Demo").fg(Color::White),
        Cell::new("Workdir").fg(Color::White),
    ]);
    for (id, index, demo) in &plan {
        let workdir = demo
            .payload
            .workdir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(id).fg(Color::Cyan),
            Cell::new(index),
            Cell::new(workdir).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!("  {} demos would run (dry run)", style(plan.len()).bold());
    println!();
    Ok(())
}

fn print_outcomes(outcomes: &[DemoOutcome], total: usize) {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Wrapper").fg(Color::White),
        Cell::new("Demo").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Exit").fg(Color::White),
        Cell::new("Time").fg(Color::White),
        Cell::new("Error").fg(Color::White),
    ]);
    for outcome in outcomes {
        let status = if outcome.success {
            Cell::new("● passed").fg(Color::Green)
        } else {
            Cell::new("✗ failed").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&outcome.wrapper).fg(Color::Cyan),
            Cell::new(outcome.demo),
            status,
            Cell::new(outcome.exit_code),
            Cell::new(format!("{:.1}s", outcome.elapsed_ms as f64 / 1000.0)).fg(Color::DarkGrey),
            Cell::new(outcome.error.as_deref().unwrap_or("")),
        ]);
    }

    let passed = outcomes.iter().filter(|o| o.success).count();
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} passed, {} failed, {} not run",
        style(passed).green().bold(),
        style(outcomes.len() - passed).red().bold(),
        total - outcomes.len()
    );
    for outcome in outcomes.iter().filter(|o| !o.success) {
        if let Some(dir) = &outcome.workdir {
            println!("  {} {} kept at {}", style("•").dim(), outcome.wrapper, style(dir.display()).dim());
        }
    }
    println!();
}
