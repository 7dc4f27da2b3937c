//! Dice server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!   GET /rolldice
//!   ─────────────▶ request id ─▶ http logs ─▶ telemetry ─▶ timeout ─▶ roll_dice
//!                                               │                       │
//!                                   timer + SERVER span          roll_dice span
//!                                               │                       │
//!                                               ▼                       ▼
//!                                   http.server.duration        batch export ─▶ stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use dice_server::config::load_config;
use dice_server::http::HttpServer;
use dice_server::lifecycle::{signals, Shutdown};
use dice_server::observability::{logging, metrics, Telemetry};

#[derive(Parser)]
#[command(name = "dice-server")]
#[command(about = "Instrumented dice rolling HTTP service", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability)?;
    tracing::info!("dice-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        request_timeout_secs = config.timeouts.request_secs,
        span_exporter = ?config.observability.span_exporter,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Some(addr) = config.observability.metrics_socket_addr() {
            metrics::init_metrics(addr)?;
        }
    }

    let telemetry = Arc::new(Telemetry::from_config(&config.observability));

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config, telemetry.clone());
    server.run(listener, shutdown.subscribe()).await?;

    telemetry.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
