//! Cadenza Server - Standalone headless server for Cadenza.
//!
//! Runs the playback core behind its HTTP control API so a chat front end
//! (or anything else that speaks HTTP) can drive per-guild music sessions.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use cadenza_core::{bootstrap_services, start_server};
use clap::Parser;
use tokio::signal;

use crate::config::ServerConfig;

/// Cadenza Server - Headless guild music playback server.
#[derive(Parser, Debug)]
#[command(name = "cadenza-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CADENZA_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "CADENZA_BIND_PORT")]
    port: Option<u16>,

    /// Data directory for persistent state (playlists).
    #[arg(short = 'd', long, env = "CADENZA_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Cadenza Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }

    log::info!(
        "Configuration: bind_port={}, ytdlp={}, idle_timeout={}s",
        config.bind_port,
        config.ytdlp_path.display(),
        config.idle_timeout_secs
    );
    match config.data_dir {
        Some(ref data_dir) => log::info!("Using data directory: {}", data_dir.display()),
        None => log::info!("No data directory configured - playlists will not persist"),
    }

    let core_config = config.to_core_config();
    let services = bootstrap_services(&core_config, &config.to_bootstrap_options())
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    // Release voice connections a crashed previous run may have left behind
    // before the first command can arrive.
    let released = services.reconcile().await;
    if released > 0 {
        log::warn!("Released {} orphaned voice connection(s)", released);
    }

    let app_state = services.app_state();
    let server_shutdown = services.cancel_token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state, server_shutdown).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Graceful shutdown: sessions first, then the HTTP server drains
    services.shutdown().await;
    if let Err(e) = server_handle.await {
        log::warn!("Server task ended abnormally: {}", e);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
