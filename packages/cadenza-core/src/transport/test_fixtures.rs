//! Scriptable voice transport double shared by the transport and session tests.
//!
//! Finish callbacks are always invoked from a freshly spawned OS thread so the
//! cross-thread handoff is exercised exactly as a real audio worker would.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    FinishCallback, TransportError, TransportEvent, TransportEventSink, TransportResult,
    VoiceConnection, VoiceTransport,
};
use crate::types::{ChannelId, SpaceId, Track};

#[derive(Default)]
struct Shared {
    script: Mutex<VecDeque<TransportResult<()>>>,
    connect_delay: Mutex<Duration>,
    connect_calls: AtomicUsize,
    cleanup_calls: AtomicUsize,
    resources: Mutex<HashSet<SpaceId>>,
    links: Mutex<Vec<Arc<MockLink>>>,
}

/// Voice transport whose connect outcomes are scripted up front.
///
/// An exhausted script means every further connect succeeds.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    shared: Arc<Shared>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_connects(&self, outcomes: impl IntoIterator<Item = TransportResult<()>>) {
        self.shared.script.lock().extend(outcomes);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.shared.connect_delay.lock() = delay;
    }

    /// Pretends a previous run left a connection behind for `space`.
    pub fn seed_stale_resource(&self, space: &SpaceId) {
        self.shared.resources.lock().insert(space.clone());
    }

    pub fn connect_calls(&self) -> usize {
        self.shared.connect_calls.load(Ordering::SeqCst)
    }

    pub fn cleanup_calls(&self) -> usize {
        self.shared.cleanup_calls.load(Ordering::SeqCst)
    }

    /// Most recently established connection.
    pub fn last_link(&self) -> Option<Arc<MockLink>> {
        self.shared.links.lock().last().cloned()
    }

    pub fn link_count(&self) -> usize {
        self.shared.links.lock().len()
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    async fn connect(
        &self,
        space: &SpaceId,
        channel: &ChannelId,
        _timeout: Duration,
        events: TransportEventSink,
    ) -> TransportResult<Box<dyn VoiceConnection>> {
        self.shared.connect_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.shared.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        // Even a failed attempt leaves a half-established resource behind.
        self.shared.resources.lock().insert(space.clone());

        let outcome = self.shared.script.lock().pop_front().unwrap_or(Ok(()));
        outcome?;

        let link = Arc::new(MockLink {
            space: space.clone(),
            channel: Mutex::new(channel.clone()),
            connected: AtomicBool::new(true),
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            volume: AtomicU8::new(0),
            played: Mutex::new(Vec::new()),
            pending_finish: Mutex::new(None),
            fail_next_play: AtomicBool::new(false),
            stop_calls: AtomicUsize::new(0),
            pause_calls: AtomicUsize::new(0),
            resume_calls: AtomicUsize::new(0),
            move_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            events,
        });
        self.shared.links.lock().push(link.clone());

        Ok(Box::new(MockConnection {
            link,
            shared: self.shared.clone(),
        }))
    }

    async fn cleanup_partial(&self, space: &SpaceId) {
        self.shared.cleanup_calls.fetch_add(1, Ordering::SeqCst);
        self.shared.resources.lock().remove(space);
    }

    fn has_resource(&self, space: &SpaceId) -> bool {
        self.shared.resources.lock().contains(space)
    }

    fn active_spaces(&self) -> Vec<SpaceId> {
        self.shared.resources.lock().iter().cloned().collect()
    }
}

/// Observable state of one mock connection.
pub(crate) struct MockLink {
    pub space: SpaceId,
    pub channel: Mutex<ChannelId>,
    pub connected: AtomicBool,
    pub playing: AtomicBool,
    pub paused: AtomicBool,
    pub volume: AtomicU8,
    pub played: Mutex<Vec<Track>>,
    pending_finish: Mutex<Option<FinishCallback>>,
    pub fail_next_play: AtomicBool,
    pub stop_calls: AtomicUsize,
    pub pause_calls: AtomicUsize,
    pub resume_calls: AtomicUsize,
    pub move_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    events: TransportEventSink,
}

impl MockLink {
    /// Finishes the current track from a foreign thread.
    ///
    /// Returns false if nothing was rendering.
    pub fn finish_current(&self, error: Option<TransportError>) -> bool {
        let Some(callback) = self.pending_finish.lock().take() else {
            return false;
        };
        self.playing.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        std::thread::spawn(move || callback(error))
            .join()
            .expect("finish thread panicked");
        true
    }

    /// Takes the pending callback without firing it, to replay it later as a stale notification.
    pub fn steal_finish(&self) -> Option<FinishCallback> {
        self.pending_finish.lock().take()
    }

    /// Reports an unexpected disconnect from a foreign thread.
    pub fn drop_connection(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        let events = self.events.clone();
        let reason = reason.to_string();
        std::thread::spawn(move || events(TransportEvent::Disconnected { reason }))
            .join()
            .expect("event thread panicked");
    }

    pub fn played_titles(&self) -> Vec<String> {
        self.played.lock().iter().map(|t| t.title.clone()).collect()
    }
}

struct MockConnection {
    link: Arc<MockLink>,
    shared: Arc<Shared>,
}

#[async_trait]
impl VoiceConnection for MockConnection {
    fn channel(&self) -> ChannelId {
        self.link.channel.lock().clone()
    }

    fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::SeqCst)
    }

    async fn move_to(&self, channel: &ChannelId) -> TransportResult<()> {
        self.link.move_calls.fetch_add(1, Ordering::SeqCst);
        *self.link.channel.lock() = channel.clone();
        Ok(())
    }

    fn play(&self, track: &Track, volume: u8, on_finish: FinishCallback) -> TransportResult<()> {
        if self.link.fail_next_play.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Playback("source unavailable".into()));
        }
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.link.played.lock().push(track.clone());
        self.link.volume.store(volume, Ordering::SeqCst);
        self.link.playing.store(true, Ordering::SeqCst);
        self.link.paused.store(false, Ordering::SeqCst);
        *self.link.pending_finish.lock() = Some(on_finish);
        Ok(())
    }

    fn pause(&self) {
        self.link.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.link.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.link.resume_calls.fetch_add(1, Ordering::SeqCst);
        self.link.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.link.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.link.finish_current(None);
    }

    fn set_volume(&self, volume: u8) {
        self.link.volume.store(volume, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.link.playing.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.link.paused.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.link.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.link.connected.store(false, Ordering::SeqCst);
        self.link.pending_finish.lock().take();
        self.shared.resources.lock().remove(&self.link.space);
    }
}
