//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where the
//! transport, resolver, playlist store, event bridge and session manager are
//! instantiated and wired together.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::AppState;
use crate::events::{BroadcastEventBridge, EventEmitter, LoggingEventEmitter};
use crate::playlist::{InMemoryPlaylistStore, JsonFilePlaylistStore, PlaylistError, PlaylistStore};
use crate::resolver::{TrackResolver, YtDlpResolver};
use crate::runtime::TokioSpawner;
use crate::services::{SessionDeps, SessionManager};
use crate::state::Config;
use crate::transport::{SimulatedTransport, VoiceTransport};

/// Errors that prevent the services from starting.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to open playlist store: {0}")]
    Playlists(#[from] PlaylistError),
}

/// Where the concrete collaborators come from.
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Directory for `playlists.json`. `None` keeps playlists in memory.
    pub playlist_dir: Option<PathBuf>,
    /// `yt-dlp` executable.
    pub ytdlp_path: PathBuf,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            playlist_dir: None,
            ytdlp_path: PathBuf::from("yt-dlp"),
        }
    }
}

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Command API.
    pub manager: Arc<SessionManager>,
    /// Event bridge feeding the HTTP event stream.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Voice transport shared by every session.
    pub transport: Arc<dyn VoiceTransport>,
    pub config: Arc<Config>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Shared state for the HTTP layer.
    pub fn app_state(&self) -> AppState {
        AppState {
            manager: Arc::clone(&self.manager),
            event_bridge: Arc::clone(&self.event_bridge),
            config: Arc::clone(&self.config),
        }
    }

    /// Releases voice connections left behind by a previous run.
    pub async fn reconcile(&self) -> usize {
        self.manager.reconcile().await
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Tear sessions down first so every connection is released before
        // background tasks are cancelled.
        self.manager.shutdown().await;
        self.cancel_token.cancel();

        let leftovers = self.transport.active_spaces();
        for space in &leftovers {
            self.transport.cleanup_partial(space).await;
        }
        if !leftovers.is_empty() {
            log::warn!(
                "[Bootstrap] Released {} voice resource(s) held outside any session",
                leftovers.len()
            );
        }

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps the production services: simulated transport, `yt-dlp`
/// resolver and the configured playlist store.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the playlist store
/// cannot be opened.
pub fn bootstrap_services(
    config: &Config,
    options: &BootstrapOptions,
) -> Result<BootstrappedServices, BootstrapError> {
    let playlists: Arc<dyn PlaylistStore> = match &options.playlist_dir {
        Some(dir) => Arc::new(JsonFilePlaylistStore::open(dir)?),
        None => {
            log::info!("[Bootstrap] No playlist directory configured, playlists are not persisted");
            Arc::new(InMemoryPlaylistStore::new())
        }
    };
    let resolver = Arc::new(YtDlpResolver::new(
        options.ytdlp_path.clone(),
        config.resolve_timeout(),
    ));
    let transport = Arc::new(SimulatedTransport::default());

    bootstrap_with(config, transport, resolver, Some(playlists))
}

/// Wires the services around caller-supplied collaborators.
///
/// Wiring order:
///
/// 1. Task spawner and cancellation token
/// 2. Event bridge (with a logging emitter attached)
/// 3. Session dependencies
/// 4. Session manager
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
pub fn bootstrap_with(
    config: &Config,
    transport: Arc<dyn VoiceTransport>,
    resolver: Arc<dyn TrackResolver>,
    playlists: Option<Arc<dyn PlaylistStore>>,
) -> Result<BootstrappedServices, BootstrapError> {
    config.validate().map_err(BootstrapError::InvalidConfig)?;
    let config = Arc::new(config.clone());

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();

    let event_bridge = Arc::new(BroadcastEventBridge::new(config.event_channel_capacity));
    event_bridge.set_external_emitter(Arc::new(LoggingEventEmitter));

    let deps = SessionDeps {
        config: Arc::clone(&config),
        transport: Arc::clone(&transport),
        emitter: Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        spawner: spawner.clone(),
        shutdown: cancel_token.clone(),
    };
    let manager = Arc::new(SessionManager::new(deps, resolver, playlists));

    log::info!(
        "[Bootstrap] Services ready (idle timeout {:?}, {} connect attempt(s))",
        config.idle_timeout(),
        config.connect_attempts
    );

    Ok(BootstrappedServices {
        manager,
        event_bridge,
        transport,
        config,
        spawner,
        cancel_token,
    })
}
