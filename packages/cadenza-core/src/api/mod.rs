//! HTTP API layer.
//!
//! Thin handlers that delegate to [`SessionManager`]. Provides the router
//! construction and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::events::BroadcastEventBridge;
use crate::services::SessionManager;
use crate::state::Config;

pub mod http;
pub mod response;

/// First port tried when no port is configured.
pub const DEFAULT_PORT_START: u16 = 8470;
/// Last port tried when no port is configured.
pub const DEFAULT_PORT_END: u16 = 8480;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    /// Command API.
    pub manager: Arc<SessionManager>,
    /// Source for the server-sent event stream.
    pub event_bridge: Arc<BroadcastEventBridge>,
    pub config: Arc<Config>,
}

async fn find_available_port(
    start: u16,
    end: u16,
) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    for port in start..=end {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Binds the configured port, or the first free one in the default range.
pub async fn bind(config: &Config) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    if config.preferred_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.preferred_port));
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        return Ok((config.preferred_port, listener));
    }
    find_available_port(DEFAULT_PORT_START, DEFAULT_PORT_END).await
}

/// Serves the API until `shutdown` is cancelled.
pub async fn start_server(state: AppState, shutdown: CancellationToken) -> Result<(), ServerError> {
    let (port, listener) = bind(&state.config).await?;

    log::info!("[Api] Server listening on http://0.0.0.0:{}", port);
    let app = http::create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
