//! In-process voice transport that renders tracks on a worker thread.
//!
//! No audio leaves the process: a "rendered" track simply occupies its worker
//! thread for the track's duration, honouring pause, resume and stop, and then
//! invokes the finish callback from that thread. The standalone server runs on
//! this transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Condvar, Mutex};

use super::{
    FinishCallback, TransportError, TransportEvent, TransportEventSink, TransportResult,
    VoiceConnection, VoiceTransport,
};
use crate::types::{ChannelId, SpaceId, Track};
use crate::utils::preview_locator;

/// Duration used for tracks whose length the resolver could not determine.
pub const DEFAULT_TRACK_DURATION: Duration = Duration::from_secs(180);

type LinkMap = Arc<Mutex<HashMap<SpaceId, Arc<Link>>>>;

/// Simulated voice transport.
#[derive(Clone)]
pub struct SimulatedTransport {
    links: LinkMap,
    default_duration: Duration,
    handshake_delay: Duration,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TRACK_DURATION)
    }
}

impl SimulatedTransport {
    /// Creates a transport that renders unknown-length tracks for `default_duration`.
    pub fn new(default_duration: Duration) -> Self {
        Self {
            links: Arc::new(Mutex::new(HashMap::new())),
            default_duration,
            handshake_delay: Duration::ZERO,
        }
    }

    /// Sets an artificial handshake delay applied to every connect.
    #[must_use]
    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    /// Registers a connection nobody owns, as a crashed previous run would leave behind.
    pub fn adopt_stale_connection(&self, space: &SpaceId, channel: &ChannelId) {
        let link = Link::new(space.clone(), channel.clone(), Arc::new(|_| {}));
        self.links.lock().insert(space.clone(), link);
    }

    /// Drops the live connection for `space` as if the voice server went away.
    ///
    /// The event is delivered from a worker thread. Returns false if no
    /// connection exists.
    pub fn drop_connection(&self, space: &SpaceId, reason: &str) -> bool {
        let Some(link) = self.links.lock().remove(space) else {
            return false;
        };
        link.shutdown();
        let events = link.events.clone();
        let reason = reason.to_string();
        std::thread::spawn(move || events(TransportEvent::Disconnected { reason }));
        true
    }
}

#[async_trait]
impl VoiceTransport for SimulatedTransport {
    async fn connect(
        &self,
        space: &SpaceId,
        channel: &ChannelId,
        timeout: Duration,
        events: TransportEventSink,
    ) -> TransportResult<Box<dyn VoiceConnection>> {
        if self.handshake_delay >= timeout {
            return Err(TransportError::Timeout(timeout));
        }
        if !self.handshake_delay.is_zero() {
            tokio::time::sleep(self.handshake_delay).await;
        }

        let link = Link::new(space.clone(), channel.clone(), events);
        if let Some(previous) = self.links.lock().insert(space.clone(), link.clone()) {
            log::warn!(
                "[Transport] Replaced existing simulated connection for space {}",
                space
            );
            previous.shutdown();
        }

        log::info!("[Transport] Connected to {} in space {}", channel, space);
        Ok(Box::new(SimulatedConnection {
            link,
            links: self.links.clone(),
            default_duration: self.default_duration,
        }))
    }

    async fn cleanup_partial(&self, space: &SpaceId) {
        if let Some(link) = self.links.lock().remove(space) {
            log::debug!("[Transport] Released simulated resource for space {}", space);
            link.shutdown();
        }
    }

    fn has_resource(&self, space: &SpaceId) -> bool {
        self.links.lock().contains_key(space)
    }

    fn active_spaces(&self) -> Vec<SpaceId> {
        self.links.lock().keys().cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Render worker
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RenderState {
    /// Incremented on every play; a worker exits once it no longer matches.
    render_id: u64,
    active: bool,
    paused: bool,
    remaining: Duration,
}

struct Link {
    space: SpaceId,
    channel: Mutex<ChannelId>,
    connected: AtomicBool,
    volume: AtomicU8,
    render: Mutex<RenderState>,
    wake: Condvar,
    events: TransportEventSink,
}

impl Link {
    fn new(space: SpaceId, channel: ChannelId, events: TransportEventSink) -> Arc<Self> {
        Arc::new(Self {
            space,
            channel: Mutex::new(channel),
            connected: AtomicBool::new(true),
            volume: AtomicU8::new(100),
            render: Mutex::new(RenderState::default()),
            wake: Condvar::new(),
            events,
        })
    }

    fn stop_render(&self) {
        let mut state = self.render.lock();
        state.active = false;
        state.paused = false;
        self.wake.notify_all();
    }

    fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.stop_render();
    }

    /// Blocks the calling worker thread until render `id` ends.
    ///
    /// Returns true if the track played to completion.
    fn run_render(&self, id: u64) -> bool {
        let mut state = self.render.lock();
        loop {
            if state.render_id != id || !state.active {
                return false;
            }
            if state.paused {
                self.wake.wait(&mut state);
                continue;
            }

            let remaining = state.remaining;
            let started = Instant::now();
            let _ = self.wake.wait_for(&mut state, remaining);
            if state.render_id != id {
                return false;
            }
            state.remaining = state.remaining.saturating_sub(started.elapsed());
            if state.remaining.is_zero() && state.active {
                state.active = false;
                return true;
            }
        }
    }
}

struct SimulatedConnection {
    link: Arc<Link>,
    links: LinkMap,
    default_duration: Duration,
}

#[async_trait]
impl VoiceConnection for SimulatedConnection {
    fn channel(&self) -> ChannelId {
        self.link.channel.lock().clone()
    }

    fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::SeqCst)
    }

    async fn move_to(&self, channel: &ChannelId) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        *self.link.channel.lock() = channel.clone();
        Ok(())
    }

    fn play(&self, track: &Track, volume: u8, on_finish: FinishCallback) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let duration = track
            .duration_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_duration);

        let id = {
            let mut state = self.link.render.lock();
            if state.active {
                return Err(TransportError::Playback("already rendering".into()));
            }
            state.render_id += 1;
            state.active = true;
            state.paused = false;
            state.remaining = duration;
            state.render_id
        };
        self.link.volume.store(volume, Ordering::SeqCst);

        log::debug!(
            "[Transport] Rendering '{}' from {} for {:?} in space {}",
            track.title,
            preview_locator(&track.stream_locator),
            duration,
            self.link.space
        );

        let link = self.link.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("render-{}", self.link.space))
            .spawn(move || {
                link.run_render(id);
                on_finish(None);
            });

        if let Err(e) = spawned {
            self.link.stop_render();
            return Err(TransportError::Playback(format!(
                "failed to start render worker: {e}"
            )));
        }
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.link.render.lock();
        if state.active {
            state.paused = true;
            self.link.wake.notify_all();
        }
    }

    fn resume(&self) {
        let mut state = self.link.render.lock();
        if state.active && state.paused {
            state.paused = false;
            self.link.wake.notify_all();
        }
    }

    fn stop(&self) {
        self.link.stop_render();
    }

    fn set_volume(&self, volume: u8) {
        self.link.volume.store(volume.min(100), Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        let state = self.link.render.lock();
        state.active && !state.paused
    }

    fn is_paused(&self) -> bool {
        let state = self.link.render.lock();
        state.active && state.paused
    }

    async fn disconnect(&self) {
        self.link.shutdown();
        let mut links = self.links.lock();
        if links
            .get(&self.link.space)
            .is_some_and(|current| Arc::ptr_eq(current, &self.link))
        {
            links.remove(&self.link.space);
        }
        log::info!("[Transport] Disconnected from space {}", self.link.space);
    }
}
