//! Event system for observing session lifecycle.
//!
//! This module provides:
//! - [`EventEmitter`] trait for services to emit events
//! - [`BroadcastEventBridge`] for the server-sent-events stream
//! - Event types for session playback and playlist changes

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::playlist::PlaylistId;
use crate::types::{ChannelId, SpaceId, Track};

/// Events broadcast to observers.
///
/// Each category has its own inner event type with specific variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Playback session lifecycle events.
    Session(SessionEvent),

    /// Playlist store changes.
    Playlist(PlaylistEvent),
}

/// Why a session released its voice connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DisconnectReason {
    /// A caller issued `stop`.
    Stopped,
    /// The inactivity watchdog fired while idle with an empty queue.
    IdleTimeout,
    /// The watchdog fired while the bot was alone in its channel.
    Alone,
    /// The transport reported the connection dropped.
    TransportLost,
    /// The collaboration space went away.
    SpaceRemoved,
    /// Process shutdown.
    Shutdown,
}

/// Events describing playback session state transitions.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A connect attempt started.
    Connecting {
        space: SpaceId,
        channel: ChannelId,
        timestamp: u64,
    },
    /// The voice connection is established.
    Connected {
        space: SpaceId,
        channel: ChannelId,
        timestamp: u64,
    },
    /// Connect exhausted its retry policy.
    ConnectFailed {
        space: SpaceId,
        attempts: u32,
        error: String,
        timestamp: u64,
    },
    /// A track started rendering.
    TrackStarted {
        space: SpaceId,
        track: Track,
        generation: u64,
        timestamp: u64,
    },
    /// A track finished, cleanly or with a playback error.
    TrackFinished {
        space: SpaceId,
        track: Track,
        generation: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        timestamp: u64,
    },
    /// Playback was paused.
    Paused { space: SpaceId, timestamp: u64 },
    /// Playback was resumed.
    Resumed { space: SpaceId, timestamp: u64 },
    /// The last track finished and nothing is pending.
    QueueDrained { space: SpaceId, timestamp: u64 },
    /// The connection moved to another channel without interrupting playback.
    Moved {
        space: SpaceId,
        from: ChannelId,
        to: ChannelId,
        timestamp: u64,
    },
    /// The session released its voice connection.
    Disconnected {
        space: SpaceId,
        reason: DisconnectReason,
        timestamp: u64,
    },
    /// A stale transport resource with no owning session was force-released.
    OrphanReleased { space: SpaceId, timestamp: u64 },
}

impl SessionEvent {
    /// Returns the collaboration space the event belongs to.
    pub fn space(&self) -> &SpaceId {
        match self {
            Self::Connecting { space, .. }
            | Self::Connected { space, .. }
            | Self::ConnectFailed { space, .. }
            | Self::TrackStarted { space, .. }
            | Self::TrackFinished { space, .. }
            | Self::Paused { space, .. }
            | Self::Resumed { space, .. }
            | Self::QueueDrained { space, .. }
            | Self::Moved { space, .. }
            | Self::Disconnected { space, .. }
            | Self::OrphanReleased { space, .. } => space,
        }
    }
}

/// Events related to playlist changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaylistEvent {
    /// A playlist was created.
    Created {
        space: SpaceId,
        #[serde(rename = "playlistId")]
        playlist_id: PlaylistId,
        name: String,
        timestamp: u64,
    },
    /// A playlist's track list changed.
    Updated {
        space: SpaceId,
        #[serde(rename = "playlistId")]
        playlist_id: PlaylistId,
        #[serde(rename = "trackCount")]
        track_count: usize,
        timestamp: u64,
    },
    /// A playlist was deleted.
    Deleted {
        space: SpaceId,
        #[serde(rename = "playlistId")]
        playlist_id: PlaylistId,
        timestamp: u64,
    },
}

impl From<SessionEvent> for BroadcastEvent {
    fn from(event: SessionEvent) -> Self {
        BroadcastEvent::Session(event)
    }
}

impl From<PlaylistEvent> for BroadcastEvent {
    fn from(event: PlaylistEvent) -> Self {
        BroadcastEvent::Playlist(event)
    }
}
