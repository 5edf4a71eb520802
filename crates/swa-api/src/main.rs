//! swa CLI and REST API entry point.
//!
//! Binary name: `swa`
//!
//! Parses CLI arguments, loads `config.toml` from the data directory, applies
//! command-line overrides, then dispatches to the command handler or starts
//! the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;
use swa_infra::config::load_server_config;
use swa_infra::filesystem::{DataLayout, resolve_data_dir};
use swa_observe::tracing_setup::{LogFormat, TracingOptions, filter_for_verbosity, init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "swa", &mut std::io::stdout());
        return Ok(());
    }

    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Pretty };
    let options = TracingOptions::new(filter_for_verbosity(cli.verbose))
        .format(format)
        .otel(cli.otel);
    if let Err(e) = init_tracing(&options) {
        eprintln!("failed to initialize tracing: {e}");
    }

    let data_dir = resolve_data_dir();
    let mut config = load_server_config(&data_dir).await;
    cli.apply_overrides(&mut config);

    let result = run(cli, config, data_dir).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, config: swa_types::config::ServerConfig, data_dir: std::path::PathBuf) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { .. } => {
            let addr = format!("{}:{}", config.host, config.port);
            let state = AppState::init(config, data_dir).await?;
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} swa API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());
            tracing::info!(%addr, "server started");

            let router = http::router::build_router(state);
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Parse => {
            let layout = DataLayout::new(&data_dir, &config);
            cli::parse::parse(&config, &layout, cli.json).await?;
        }

        Commands::Verify {
            include,
            dry_run,
            fast_fail,
        } => {
            let layout = DataLayout::new(&data_dir, &config);
            let options = cli::verify::VerifyOptions {
                include,
                dry_run,
                fast_fail,
            };
            cli::verify::verify(&config, &layout, &options, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
