//! Bridge implementation that maps domain events to broadcast transport.
//!
//! The [`BroadcastEventBridge`] sits between the session services and the
//! HTTP event stream, mapping typed domain events onto one broadcast channel.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::emitter::EventEmitter;
use super::{BroadcastEvent, PlaylistEvent, SessionEvent};

/// Bridges domain events to the event-stream broadcast channel.
///
/// Also forwards to an optional external emitter (for example a
/// [`LoggingEventEmitter`](super::LoggingEventEmitter)) that can be set after
/// construction.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<BroadcastEvent>,
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external emitter that receives every event as well.
    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }
}

/// Generates an [`EventEmitter`] method that forwards to the external emitter
/// (if set) and then sends to the broadcast channel.
macro_rules! impl_emit {
    ($method:ident, $event_ty:ty, $variant:ident) => {
        fn $method(&self, event: $event_ty) {
            if let Some(ref emitter) = *self.external_emitter.read() {
                emitter.$method(event.clone());
            }
            if let Err(e) = self.tx.send(BroadcastEvent::$variant(event)) {
                log::trace!("[EventBridge] No broadcast receivers: {}", e);
            }
        }
    };
}

impl EventEmitter for BroadcastEventBridge {
    impl_emit!(emit_session, SessionEvent, Session);
    impl_emit!(emit_playlist, PlaylistEvent, Playlist);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpaceId;

    #[tokio::test]
    async fn subscribers_receive_session_events() {
        let bridge = BroadcastEventBridge::new(8);
        let mut rx = bridge.subscribe();

        bridge.emit_session(SessionEvent::QueueDrained {
            space: SpaceId::new("g1"),
            timestamp: 1,
        });

        match rx.recv().await.unwrap() {
            BroadcastEvent::Session(SessionEvent::QueueDrained { space, .. }) => {
                assert_eq!(space.as_str(), "g1");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bridge = BroadcastEventBridge::new(4);
        bridge.emit_session(SessionEvent::Paused {
            space: SpaceId::new("g1"),
            timestamp: 0,
        });
    }
}
