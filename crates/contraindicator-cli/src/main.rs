//! CLI entry point for the contraindicator graph tool.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use contraindicator_cli::commands::{dispatch, outcome_name, Cli};
use contraindicator_cli::config;
use contraindicator_graph::{ensure_seed_data, GraphClient, SharedStore};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries only command results.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let app_config = config::load(&cli.config)?;

    let client = GraphClient::connect(&app_config.neo4j).await?;
    let store: SharedStore = Arc::new(client);

    if !cli.command.seeds_itself() {
        let enabled = app_config.seed.enabled && !cli.no_seed;
        let outcome = ensure_seed_data(&store, enabled).await?;
        tracing::debug!(outcome = outcome_name(outcome), "Startup checks done");
    }

    let result = dispatch(cli.command, &store, &mut std::io::stdin().lock()).await?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &result)?;
    writeln!(stdout)?;
    Ok(())
}
