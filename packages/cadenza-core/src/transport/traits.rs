//! Trait abstractions for voice transport operations.
//!
//! These traits enable dependency injection for testability. The session
//! actor depends on them rather than a concrete voice library.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::TransportResult;
use super::TransportError;
use crate::types::{ChannelId, SpaceId, Track};

/// Invoked exactly once when a track stops rendering.
///
/// `None` means the track ended cleanly (or was stopped); `Some` carries a
/// mid-track playback error. May run on any thread.
pub type FinishCallback = Box<dyn FnOnce(Option<TransportError>) + Send + 'static>;

/// Out-of-band notifications from a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection dropped without the session asking for it.
    Disconnected { reason: String },
}

/// Receives [`TransportEvent`]s for one connection. May be called from any thread.
pub type TransportEventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Factory and bookkeeping side of a voice transport.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Establishes a connection to `channel` within `space`.
    ///
    /// # Arguments
    /// * `space` - Collaboration space the connection belongs to
    /// * `channel` - Voice channel to join
    /// * `timeout` - Handshake deadline
    /// * `events` - Sink for unexpected disconnects on this connection
    async fn connect(
        &self,
        space: &SpaceId,
        channel: &ChannelId,
        timeout: Duration,
        events: TransportEventSink,
    ) -> TransportResult<Box<dyn VoiceConnection>>;

    /// Releases whatever the transport still holds for `space`.
    ///
    /// Covers half-established connections and stale connections left by a
    /// previous run. No-op if nothing is held.
    async fn cleanup_partial(&self, space: &SpaceId);

    /// Returns true if the transport holds any resource for `space`.
    fn has_resource(&self, space: &SpaceId) -> bool;

    /// Lists every space the transport currently holds a resource for.
    fn active_spaces(&self) -> Vec<SpaceId>;
}

/// One live connection for one collaboration space.
///
/// Owned exclusively by that space's session.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Channel the connection is currently in.
    fn channel(&self) -> ChannelId;

    fn is_connected(&self) -> bool;

    /// Moves to another channel in the same space without interrupting playback.
    async fn move_to(&self, channel: &ChannelId) -> TransportResult<()>;

    /// Starts rendering `track` at `volume` percent.
    ///
    /// On success `on_finish` will be invoked exactly once, possibly from a
    /// foreign thread. On error it is dropped without being called.
    fn play(&self, track: &Track, volume: u8, on_finish: FinishCallback) -> TransportResult<()>;

    fn pause(&self);

    fn resume(&self);

    /// Stops rendering. The pending finish callback fires with `None`.
    fn stop(&self);

    /// Applies `volume` percent to the current and future tracks.
    fn set_volume(&self, volume: u8);

    fn is_playing(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Leaves the channel and releases the transport resource.
    async fn disconnect(&self);
}
