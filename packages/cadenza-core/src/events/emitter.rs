//! Event emitter abstraction for decoupling services from transport.
//!
//! Services depend on the [`EventEmitter`] trait rather than concrete broadcast
//! channels, enabling testing and alternative delivery mechanisms.

use super::{PlaylistEvent, SessionEvent};

/// Trait for emitting domain events without knowledge of delivery.
///
/// Session actors call this from their own task, so implementations must not
/// block.
pub trait EventEmitter: Send + Sync {
    /// Emits a session lifecycle event.
    fn emit_session(&self, event: SessionEvent);

    /// Emits a playlist change event.
    fn emit_playlist(&self, event: PlaylistEvent);
}

/// No-op emitter for testing or when nobody listens.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_session(&self, _event: SessionEvent) {}

    fn emit_playlist(&self, _event: PlaylistEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_session(&self, event: SessionEvent) {
        tracing::debug!(?event, "session_event");
    }

    fn emit_playlist(&self, event: PlaylistEvent) {
        tracing::debug!(?event, "playlist_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpaceId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test emitter that counts events.
    struct CountingEventEmitter {
        session_count: AtomicUsize,
        playlist_count: AtomicUsize,
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit_session(&self, _event: SessionEvent) {
            self.session_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_playlist(&self, _event: PlaylistEvent) {
            self.playlist_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter {
            session_count: AtomicUsize::new(0),
            playlist_count: AtomicUsize::new(0),
        });
        let dyn_emitter: Arc<dyn EventEmitter> = emitter.clone();

        dyn_emitter.emit_session(SessionEvent::Paused {
            space: SpaceId::new("g"),
            timestamp: 0,
        });
        dyn_emitter.emit_session(SessionEvent::Resumed {
            space: SpaceId::new("g"),
            timestamp: 0,
        });

        assert_eq!(emitter.session_count.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.playlist_count.load(Ordering::SeqCst), 0);
    }
}
