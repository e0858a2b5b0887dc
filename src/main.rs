//! legacy-send-proxy
//!
//! ```text
//!     Client ──▶ http server ──▶ rewrite (legacy GET → JSON POST)
//!                                   │
//!                                   ▼
//!                               forwarder ──▶ Backend
//!                           (pool, timeouts, retry once on 502/503)
//!                                   │
//!                                   ▼
//!     Client ◀── relay ◀──── fallback (no active sessions → queued send)
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use legacy_send_proxy::config::load_config;
use legacy_send_proxy::http::HttpServer;
use legacy_send_proxy::lifecycle::{wait_for_termination, Shutdown};
use legacy_send_proxy::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "legacy-send-proxy", version, about)]
struct Cli {
    /// TOML configuration file. Environment variables override its values.
    #[arg(long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.backend.url,
        max_connections = config.backend.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let receiver = shutdown.subscribe();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_termination().await {
            Ok(signal) => tracing::info!(signal, "Termination signal received"),
            Err(e) => tracing::error!(error = %e, "Signal handler failed, shutting down"),
        }
        trigger.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
