//! Real-time voice transport capability.
//!
//! The playback core never speaks a voice protocol itself. It drives a
//! [`VoiceTransport`] / [`VoiceConnection`] pair and tolerates finish
//! callbacks and connection events arriving on foreign threads.

mod retry;
mod simulated;
mod traits;

#[cfg(test)]
pub(crate) mod test_fixtures;

use std::time::Duration;

use thiserror::Error;

pub use retry::{connect_with_retry, ConnectFailure, RetryPolicy};
pub use simulated::SimulatedTransport;
pub use traits::{
    FinishCallback, TransportEvent, TransportEventSink, VoiceConnection, VoiceTransport,
};

/// Errors reported by a voice transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connect or handshake did not complete in time.
    #[error("Connect timed out after {0:?}")]
    Timeout(Duration),

    /// Bot lacks the permission to join or speak in the channel.
    #[error("Missing permission: {0}")]
    PermissionDenied(String),

    /// Target channel does not exist.
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// Voice handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Operation requires a live connection.
    #[error("Not connected")]
    NotConnected,

    /// Rendering failed mid-track or could not start.
    #[error("Playback error: {0}")]
    Playback(String),
}

impl TransportError {
    /// Returns true if a connect failing with this error is worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Handshake(_) | Self::NotConnected)
    }
}

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
