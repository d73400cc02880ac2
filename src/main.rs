//! Portfolio API
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ request ID / trace / timeout / deadline context
//!                          │
//!                          ▼
//!                  ┌────────────────────────── protection pipeline ─┐
//!                  │ validation → admission gate → global limit    │
//!                  │            → per-client limit                 │
//!                  └────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//!                  security headers → CORS → catch panic
//!                          │
//!                          ▼
//!                  handler ──▶ bounded operation ──▶ content store
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use portfolio_api::config::load_config;
use portfolio_api::lifecycle::{shutdown_signal, Shutdown};
use portfolio_api::observability::{logging, metrics};
use portfolio_api::{HttpServer, StaticContentStore};

#[derive(Parser)]
#[command(name = "portfolio-api")]
#[command(about = "Portfolio content API", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "PORTFOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// JSON content file, overriding `content.data_path`.
    #[arg(long)]
    content: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if args.content.is_some() {
        config.content.data_path = args.content;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "portfolio-api starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit_rps = config.rate_limit.requests_per_second,
        rate_limit_burst = config.rate_limit.burst_size,
        global_rpm = config.global_rate_limit.requests_per_minute,
        max_in_flight = config.concurrency.max_in_flight,
        operation_timeout_ms = config.timeouts.operation_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(StaticContentStore::load(config.content.data_path.as_deref())?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config, store);
    let server_shutdown = shutdown.subscribe();

    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        signal_shutdown.trigger(signal);
    });

    server.run(listener, server_shutdown).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
