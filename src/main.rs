//! Body pipeline server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ axum / tower-http layers (request id, trace, timeout)
//!                          │
//!                          ▼
//!                      Pipeline ── Exchange (per request)
//!                          │
//!                          ├─▶ BodyParser  (accumulate → dispatch → decode)
//!                          ├─▶ Echo        (report decoded body and uploads)
//!                          │
//!                          ▼
//!     Client Response ◀─ Signal → Response, attachments released
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use body_pipeline::config::{load_config, AppConfig};
use body_pipeline::lifecycle::{signals, Shutdown};
use body_pipeline::observability::{logging, metrics};
use body_pipeline::HttpServer;

#[derive(Parser)]
#[command(name = "body-pipeline")]
#[command(about = "HTTP server that decodes request bodies through a middleware chain", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("body-pipeline v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_length = %config.body.max_length,
        upload_dir = ?config.body.upload_dir,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
