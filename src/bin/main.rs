//! Command-line entry point for tidewater.

use anyhow::{Context, Result};
use clap::Parser;
use tidewater_core::cli::{
    handle_catalog, handle_config, handle_delete, handle_store, handle_timeseries, Cli, Commands,
};
use tidewater_core::config::ServiceConfig;
use tidewater_core::service::TimeSeriesService;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServiceConfig::load(&cli.config).context("Failed to load configuration")?;

    // Initialize logging
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = if cli.verbose > 0 {
        level.to_string().to_lowercase()
    } else {
        config.logging.filter.clone()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .parse_lossy(filter),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    debug!(engine = %config.storage.engine, connection = %config.storage.connection, "tidewater starting up");

    if matches!(cli.command, Commands::Config) {
        return handle_config(&config);
    }

    let service = TimeSeriesService::from_config(&config)
        .await
        .context("Failed to open storage")?;

    match &cli.command {
        Commands::Timeseries(cmd) => handle_timeseries(&service, cmd).await,
        Commands::Catalog(cmd) => handle_catalog(&service, cmd).await,
        Commands::Store(cmd) => handle_store(&service, cmd).await,
        Commands::Delete(cmd) => handle_delete(&service, cmd).await,
        Commands::Config => handle_config(&config),
    }
}
