//! # Quire
//!
//! Runs the resource layer (connection pools, two-tier cache, replica
//! routing and per-client rate limiting) with its maintenance jobs.

mod bootstrap;
mod di;

use clap::{Parser, Subcommand};
use quire_domain::{CliOverrides, Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "quire")]
#[command(version)]
#[command(about = "Shared resource layer: pooling, caching, replica routing and rate limiting")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<String>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    /// Minimum connections kept per pool
    #[arg(long, global = true)]
    min_connections: Option<usize>,

    /// Maximum connections per pool
    #[arg(long, global = true)]
    max_connections: Option<usize>,

    /// Write database URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the layer, run maintenance jobs and wait for Ctrl-C (default)
    Serve,
    /// Validate the configuration and print the effective settings
    CheckConfig,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            log_level: self.log_level.clone(),
            min_connections: self.min_connections,
            max_connections: self.max_connections,
            database_url: self.database_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.as_ref().unwrap_or(&Command::Serve) {
        Command::CheckConfig => {
            let config = bootstrap::load_config(cli.config.as_deref(), cli.overrides())?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Serve => {
            let config = bootstrap::load_config(cli.config.as_deref(), cli.overrides())?;
            bootstrap::init_logging(&config);
            bootstrap::log_config(cli.config.as_deref(), &config);
            serve(config).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let layer = bootstrap::build_layer(&config).await?;

    if let Err(e) = layer.prewarm().await {
        warn!(error = %e, "Pool prewarm incomplete, connections will open on demand");
    }

    let shutdown = CancellationToken::new();
    let handles = di::start_jobs(&config, &layer, shutdown.clone()).await;

    match serde_json::to_string(&layer.stats()) {
        Ok(stats) => info!(stats = %stats, "Layer started"),
        Err(e) => warn!(error = %e, "Failed to serialize layer stats"),
    }

    info!("Ready. Press Ctrl+C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }

    info!("Shutting down");
    shutdown.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "Background job ended abnormally");
        }
    }
    layer.shutdown().await;

    match serde_json::to_string(&layer.stats()) {
        Ok(stats) => info!(stats = %stats, "Layer stopped"),
        Err(e) => warn!(error = %e, "Failed to serialize layer stats"),
    }
    Ok(())
}
