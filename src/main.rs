use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};

use tofuhub::adapter::inbound::cli::command::{Cli, Commands};
use tofuhub::adapter::inbound::cli::{output, run};
use tofuhub::infrastructure::bootstrap::build_service;
use tofuhub::infrastructure::config::{Config, Secrets};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    output::configure(output::OutputConfig::new(cli.json, cli.quiet, cli.color));

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "command failed");
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    config.init_logging();

    let secrets = Secrets::from_env(config.catalog.anonymous_token.as_deref());
    debug!(?secrets, "secrets resolved");

    let service = Arc::new(
        build_service(&config, &secrets)
            .await
            .context("failed to initialise deployment service")?,
    );

    match &cli.command {
        Commands::Run(args) => run::execute_run(service, args).await?,
        Commands::Check(args) => run::execute_check(service, args).await?,
        Commands::State(args) => run::execute_state(service, args).await?,
    }
    Ok(())
}
