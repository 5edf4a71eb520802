//! CLI command definitions for the `swa` binary.
//!
//! Uses clap derive macros. Path and server flags can also be supplied via
//! `SWA_*` environment variables and override `config.toml`.

pub mod parse;
pub mod verify;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use swa_types::config::ServerConfig;
use swa_types::request::PrefillMode;

/// Run Snakemake wrappers and workflows as background jobs.
#[derive(Parser)]
#[command(name = "swa", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log records as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Root of the wrapper repository.
    #[arg(long, global = true, env = "SWA_WRAPPERS_PATH")]
    pub wrappers_path: Option<PathBuf>,

    /// Directory containing one sub-directory per workflow.
    #[arg(long, global = true, env = "SWA_WORKFLOWS_DIR")]
    pub workflows_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Host to bind to.
        #[arg(long, env = "SWA_HOST")]
        host: Option<String>,

        /// Port to listen on.
        #[arg(short, long, env = "SWA_PORT")]
        port: Option<u16>,

        /// Default execution profile for workflow jobs.
        #[arg(long, env = "SWA_WORKFLOW_PROFILE")]
        workflow_profile: Option<String>,

        /// Default prefill behaviour for workflow jobs.
        #[arg(long, value_enum, env = "SWA_PREFILL")]
        prefill: Option<PrefillArg>,
    },

    /// Rebuild the wrapper metadata cache and demo payloads.
    Parse,

    /// Execute cached demo payloads through the wrapper driver.
    Verify {
        /// Only verify these wrappers (repeatable).
        #[arg(long)]
        include: Vec<String>,

        /// List the demos that would run without running them.
        #[arg(long)]
        dry_run: bool,

        /// Stop at the first failing demo.
        #[arg(long)]
        fast_fail: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrefillArg {
    Off,
    BestEffort,
    Required,
}

impl From<PrefillArg> for PrefillMode {
    fn from(arg: PrefillArg) -> Self {
        match arg {
            PrefillArg::Off => PrefillMode::Off,
            PrefillArg::BestEffort => PrefillMode::BestEffort,
            PrefillArg::Required => PrefillMode::Required,
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(path) = &self.wrappers_path {
            config.wrappers_path = Some(path.clone());
        }
        if let Some(dir) = &self.workflows_dir {
            config.workflows_dir = Some(dir.clone());
        }
        if let Commands::Serve {
            host,
            port,
            workflow_profile,
            prefill,
        } = &self.command
        {
            if let Some(host) = host {
                config.host = host.clone();
            }
            if let Some(port) = port {
                config.port = *port;
            }
            if let Some(profile) = workflow_profile {
                config.workflow_profile = Some(profile.clone());
            }
            if let Some(prefill) = prefill {
                config.prefill = (*prefill).into();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_flags_override_file_config() {
        let cli = Cli::try_parse_from([
            "swa",
            "--wrappers-path",
            "/opt/wrappers",
            "serve",
            "--port",
            "9100",
            "--prefill",
            "best-effort",
        ])
        .unwrap();
        let mut config = ServerConfig {
            workflow_profile: Some("from-file".into()),
            ..Default::default()
        };
        cli.apply_overrides(&mut config);
        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.prefill, PrefillMode::BestEffort);
        assert_eq!(config.workflow_profile.as_deref(), Some("from-file"));
        assert_eq!(config.wrappers_path, Some(PathBuf::from("/opt/wrappers")));
    }

    #[test]
    fn verify_accepts_repeated_include() {
        let cli = Cli::try_parse_from([
            "swa",
            "verify",
            "--include",
            "bio/samtools/faidx",
            "--include",
            "bio/bwa/index",
            "--fast-fail",
        ])
        .unwrap();
        match cli.command {
            Commands::Verify {
                include,
                dry_run,
                fast_fail,
            } => {
                assert_eq!(include.len(), 2);
                assert!(!dry_run);
                assert!(fast_fail);
            }
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }
}
