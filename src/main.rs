//! Call fan-out service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client POST {"calls": [...]}
//!     ────────────────────────────▶ ┌──────────┐   ┌──────────┐   ┌──────────┐
//!                                   │  http    │──▶│ decoder  │──▶│ executor │──▶ call 1 ──▶ remote
//!                                   │  server  │   └──────────┘   │ (ordered)│──▶ call 2 ──▶ remote
//!                                   └──────────┘                  └────┬─────┘──▶ ...
//!     ◀──────────────────────────── ┌──────────┐                       │
//!     {"calls": [results...]}       │aggregator│◀──────────────────────┘
//!                                   └──────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use call_fanout::config::{load_config, FanoutConfig};
use call_fanout::http::HttpServer;
use call_fanout::lifecycle::{shutdown_signal, Shutdown};
use call_fanout::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "call-fanout")]
#[command(about = "Executes batches of outbound HTTP calls", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => FanoutConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "call-fanout starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => {
                tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    error = %e,
                    "Failed to parse metrics address"
                );
            }
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
