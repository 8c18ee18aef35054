//! Process Hub
//!
//! Serves one OGC API - Processes listing assembled from every provider in the
//! registry.
//!
//! # Usage
//! ```bash
//! # Serve GET /processes and GET /health
//! process-hub --providers providers.yaml
//!
//! # Aggregate once and print the listing
//! process-hub --providers providers.yaml list --pretty
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use process_hub::server::{router, AppState};
use process_hub::{HttpSettings, ProcessAggregator, ProviderRegistry};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser, Debug)]
#[command(name = "process-hub")]
#[command(about = "Unified OGC API - Processes listing", long_about = None)]
#[command(version)]
struct Cli {
    /// Provider registry YAML file
    #[arg(long, env = "PROCESS_HUB_PROVIDERS")]
    providers: Option<PathBuf>,

    /// Address to serve on
    #[arg(long, env = "PROCESS_HUB_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Default per-provider request timeout in seconds
    #[arg(
        long,
        env = "PROCESS_HUB_REQUEST_TIMEOUT",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    request_timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the listing over HTTP (default)
    Serve,

    /// Aggregate once and print the listing as JSON
    List {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format)?;

    let registry = match &cli.providers {
        Some(path) => ProviderRegistry::from_file(path),
        None => ProviderRegistry::load(),
    }
    .context("Failed to load provider registry")?;

    info!("Provider registry loaded ({} providers)", registry.len());

    let settings = HttpSettings {
        request_timeout: Duration::from_secs(cli.request_timeout),
        ..HttpSettings::default()
    };
    let aggregator = Arc::new(ProcessAggregator::new(Arc::new(registry), settings));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(aggregator, cli.bind).await?,
        Commands::List { pretty } => {
            let list = aggregator
                .all_processes()
                .await
                .context("Failed to aggregate processes")?;

            let rendered = if pretty {
                serde_json::to_string_pretty(&list)?
            } else {
                serde_json::to_string(&list)?
            };
            println!("{}", rendered);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, format: LogFormat) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }

    Ok(())
}

async fn serve(aggregator: Arc<ProcessAggregator>, addr: SocketAddr) -> Result<()> {
    let app = router(AppState::new(aggregator));

    info!("Process hub listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Process hub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
