//! Cadenza Core - guild-scoped audio playback sessions.
//!
//! This crate provides the playback core for Cadenza, a chat-bot music
//! player. Each collaboration space (a guild) gets one playback session with
//! its own track queue and voice connection. Front ends drive it through the
//! [`SessionManager`] command API, either in-process or over the HTTP API.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`services`]: Queue, session actor, inactivity watchdog, registry and command API
//! - [`transport`]: Voice transport capability, connect retry and a simulated transport
//! - [`resolver`]: Track metadata resolution (`yt-dlp`)
//! - [`playlist`]: Playlist persistence
//! - [`events`]: Session and playlist events
//! - [`api`]: HTTP control surface and event stream
//! - [`state`]: Configuration
//! - [`error`]: Centralized error types
//! - [`runtime`]: Task spawning abstraction
//!
//! # Abstraction Traits
//!
//! The crate defines several traits to decouple the playback core from
//! concrete infrastructure:
//!
//! - [`VoiceTransport`](transport::VoiceTransport) / [`VoiceConnection`](transport::VoiceConnection): Voice channel audio
//! - [`TrackResolver`](resolver::TrackResolver): Query → track resolution
//! - [`PlaylistStore`](playlist::PlaylistStore): Playlist persistence
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//!
//! Each trait has an implementation suitable for the standalone server.

#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod events;
pub mod playlist;
pub mod resolver;
pub mod runtime;
pub mod services;
pub mod state;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types at the crate root
pub use error::{ErrorCode, PlaybackError, PlaybackResult};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, DisconnectReason, EventEmitter, LoggingEventEmitter,
    NoopEventEmitter, PlaylistEvent, SessionEvent,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::Config;
pub use types::{ChannelId, SpaceId, Track, UserId};
pub use utils::now_millis;

// Re-export service types
pub use services::{
    EnqueueOutcome, PlaybackStatus, QueueSnapshot, SessionManager, SessionSnapshot, SessionState,
    WatchdogReason,
};

// Re-export capability types
pub use playlist::{
    InMemoryPlaylistStore, JsonFilePlaylistStore, Playlist, PlaylistError, PlaylistId,
    PlaylistStore,
};
pub use resolver::{ResolveError, TrackResolver, YtDlpResolver};
pub use transport::{SimulatedTransport, TransportError, VoiceConnection, VoiceTransport};

// Re-export bootstrap types
pub use bootstrap::{
    bootstrap_services, bootstrap_with, BootstrapError, BootstrapOptions, BootstrappedServices,
};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
