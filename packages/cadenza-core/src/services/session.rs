//! Per-space playback session actor.
//!
//! Every collaboration space gets one [`PlaybackSession`] running as its own
//! tokio task. All session state (queue, connection, watchdog, generation
//! token) is owned by that task and mutated only while it handles one
//! [`SessionMessage`] at a time, so operations on one space are serialized
//! while different spaces run fully in parallel.
//!
//! Transport finish callbacks and connection events may fire on foreign
//! threads. They never touch the session; they post a message through a
//! [`WeakUnboundedSender`] and the actor picks it up in arrival order.
//!
//! A connect runs in a separate task while the session sits in
//! `Connecting`. Plays that arrive meanwhile are parked, and a stop is
//! remembered and applied the moment the connect resolves. Commands that
//! arrive after such a stop are deferred until the stop has been applied.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::queue::{PlaybackStatus, Queue, QueueSnapshot};
use super::watchdog::{InactivityWatchdog, WatchdogReason};
use crate::error::{PlaybackError, PlaybackResult};
use crate::events::{DisconnectReason, EventEmitter, SessionEvent};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::state::Config;
use crate::transport::{
    connect_with_retry, ConnectFailure, FinishCallback, RetryPolicy, TransportError,
    TransportEvent, TransportEventSink, VoiceConnection, VoiceTransport,
};
use crate::types::{ChannelId, SpaceId, Track};
use crate::utils::now_millis;

/// Session-level state.
///
/// Mirrors the queue status, plus `Connecting` while a connect is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Connecting,
    Playing,
    Paused,
}

/// Result of a successful play request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueOutcome {
    /// The requested track began rendering as part of this request.
    pub started_immediately: bool,
    /// The track the outcome refers to (the first one for batch requests).
    pub track: Track,
    /// `0` when started immediately, otherwise the 1-based position in `pending`.
    pub queue_position: usize,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub queue: QueueSnapshot,
    pub volume: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listeners: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchdog: Option<WatchdogReason>,
}

type Reply<T> = oneshot::Sender<PlaybackResult<T>>;

/// Messages handled by the session actor.
pub(crate) enum SessionMessage {
    // Commands
    Play {
        channel: ChannelId,
        tracks: Vec<Track>,
        reply: Reply<EnqueueOutcome>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    Skip {
        reply: Reply<()>,
    },
    Stop {
        reason: DisconnectReason,
        reply: Reply<()>,
    },
    SetVolume {
        percent: u8,
        reply: Reply<()>,
    },
    ListenersChanged {
        listeners: usize,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reason: DisconnectReason,
        reply: oneshot::Sender<()>,
    },

    // Internal notifications
    ConnectResolved {
        attempt: u64,
        result: Result<Box<dyn VoiceConnection>, ConnectFailure>,
    },
    TrackEnded {
        generation: u64,
        error: Option<TransportError>,
    },
    TransportLost {
        epoch: u64,
        reason: String,
    },
    WatchdogFired {
        arm_id: u64,
    },
}

impl SessionMessage {
    /// Commands must respect ordering relative to a pending stop.
    fn is_deferrable(&self) -> bool {
        matches!(
            self,
            Self::Play { .. }
                | Self::Pause { .. }
                | Self::Resume { .. }
                | Self::Skip { .. }
                | Self::Stop { .. }
                | Self::SetVolume { .. }
                | Self::ListenersChanged { .. }
        )
    }
}

/// Collaborators shared by every session.
#[derive(Clone)]
pub struct SessionDeps {
    pub config: Arc<Config>,
    pub transport: Arc<dyn VoiceTransport>,
    pub emitter: Arc<dyn EventEmitter>,
    pub spawner: TokioSpawner,
    /// Cancelled on process shutdown; parent of every session timer.
    pub shutdown: CancellationToken,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Cheap, cloneable handle to a running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    space: SpaceId,
    tx: UnboundedSender<SessionMessage>,
}

impl SessionHandle {
    pub fn space(&self) -> &SpaceId {
        &self.space
    }

    /// True once the actor has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> PlaybackResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| PlaybackError::SessionUnavailable)?;
        rx.await.map_err(|_| PlaybackError::SessionUnavailable)
    }

    /// Enqueues `tracks` in order, connecting to `channel` first if needed.
    pub async fn play(
        &self,
        channel: ChannelId,
        tracks: Vec<Track>,
    ) -> PlaybackResult<EnqueueOutcome> {
        self.request(|reply| SessionMessage::Play {
            channel,
            tracks,
            reply,
        })
        .await?
    }

    pub async fn pause(&self) -> PlaybackResult<()> {
        self.request(|reply| SessionMessage::Pause { reply }).await?
    }

    pub async fn resume(&self) -> PlaybackResult<()> {
        self.request(|reply| SessionMessage::Resume { reply }).await?
    }

    pub async fn skip(&self) -> PlaybackResult<()> {
        self.request(|reply| SessionMessage::Skip { reply }).await?
    }

    pub async fn stop(&self) -> PlaybackResult<()> {
        self.request(|reply| SessionMessage::Stop {
            reason: DisconnectReason::Stopped,
            reply,
        })
        .await?
    }

    pub async fn set_volume(&self, percent: u8) -> PlaybackResult<()> {
        self.request(|reply| SessionMessage::SetVolume { percent, reply })
            .await?
    }

    /// Reports how many non-bot members share the bot's voice channel.
    pub fn listeners_changed(&self, listeners: usize) -> PlaybackResult<()> {
        self.tx
            .send(SessionMessage::ListenersChanged { listeners })
            .map_err(|_| PlaybackError::SessionUnavailable)
    }

    pub async fn snapshot(&self) -> PlaybackResult<SessionSnapshot> {
        self.request(|reply| SessionMessage::Snapshot { reply })
            .await
    }

    /// Tears the session down and stops the actor.
    ///
    /// Resolves once the connection has been released. A session that has
    /// already exited resolves immediately.
    pub async fn shutdown(&self, reason: DisconnectReason) {
        let _ = self
            .request(|reply| SessionMessage::Shutdown { reason, reply })
            .await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actor
// ─────────────────────────────────────────────────────────────────────────────

struct ParkedPlay {
    tracks: Vec<Track>,
    reply: Reply<EnqueueOutcome>,
}

struct ConnectInFlight {
    attempt: u64,
    channel: ChannelId,
    parked: Vec<ParkedPlay>,
    /// A stop accepted while connecting.
    stop: Option<DisconnectReason>,
}

/// Tracks consumed from the head of `pending` by one start attempt.
#[derive(Default)]
struct StartReport {
    failed: Vec<TransportError>,
    started: Option<Track>,
}

impl StartReport {
    fn consumed(&self) -> usize {
        self.failed.len() + usize::from(self.started.is_some())
    }
}

/// The per-space aggregate: queue, connection, watchdog and state machine.
pub struct PlaybackSession {
    space: SpaceId,
    deps: SessionDeps,
    self_tx: WeakUnboundedSender<SessionMessage>,
    queue: Queue,
    connection: Option<Box<dyn VoiceConnection>>,
    /// Connect attempt that produced `connection`.
    connection_epoch: u64,
    connecting: Option<ConnectInFlight>,
    next_attempt: u64,
    watchdog: InactivityWatchdog,
    /// Bumped on every start, skip, stop and teardown; finish callbacks
    /// carrying an older value are stale.
    generation: u64,
    volume: u8,
    listeners: Option<usize>,
    deferred: VecDeque<SessionMessage>,
}

impl PlaybackSession {
    /// Spawns the actor for `space` and returns its handle.
    pub fn spawn(space: SpaceId, deps: SessionDeps) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            space: space.clone(),
            self_tx: tx.downgrade(),
            queue: Queue::new(),
            connection: None,
            connection_epoch: 0,
            connecting: None,
            next_attempt: 1,
            watchdog: InactivityWatchdog::new(deps.shutdown.child_token()),
            generation: 0,
            volume: deps.config.default_volume,
            listeners: None,
            deferred: VecDeque::new(),
            deps,
        };

        log::debug!("[Session] Spawning session for space {}", space);
        let spawner = session.deps.spawner.clone();
        spawner.spawn(session.run(rx));
        SessionHandle { space, tx }
    }

    async fn run(mut self, mut rx: UnboundedReceiver<SessionMessage>) {
        while let Some(message) = rx.recv().await {
            if let SessionMessage::Shutdown { reason, reply } = message {
                self.shutdown(reason).await;
                let _ = reply.send(());
                return;
            }

            self.handle(message).await;
            self.replay_deferred().await;

            debug_assert!(self.queue.is_consistent());
        }

        // Every handle is gone.
        self.shutdown(DisconnectReason::Shutdown).await;
    }

    fn state(&self) -> SessionState {
        if self.connecting.is_some() {
            return SessionState::Connecting;
        }
        match self.queue.status() {
            PlaybackStatus::Idle => SessionState::Idle,
            PlaybackStatus::Playing => SessionState::Playing,
            PlaybackStatus::Paused => SessionState::Paused,
        }
    }

    fn emit(&self, event: SessionEvent) {
        self.deps.emitter.emit_session(event);
    }

    fn stop_pending(&self) -> bool {
        self.connecting.as_ref().is_some_and(|c| c.stop.is_some())
    }

    /// Defers commands behind a pending stop, and behind anything still
    /// waiting from an earlier one, so arrival order holds.
    async fn handle(&mut self, message: SessionMessage) {
        if message.is_deferrable() && (self.stop_pending() || !self.deferred.is_empty()) {
            self.deferred.push_back(message);
            return;
        }
        self.apply(message).await;
    }

    /// Applies deferred commands in order until another stop is pending.
    async fn replay_deferred(&mut self) {
        while !self.stop_pending() {
            let Some(deferred) = self.deferred.pop_front() else {
                break;
            };
            self.apply(deferred).await;
        }
    }

    async fn apply(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Play {
                channel,
                tracks,
                reply,
            } => self.on_play(channel, tracks, reply).await,
            SessionMessage::Pause { reply } => {
                let _ = reply.send(self.on_pause());
            }
            SessionMessage::Resume { reply } => {
                let _ = reply.send(self.on_resume());
            }
            SessionMessage::Skip { reply } => {
                let _ = reply.send(self.on_skip());
            }
            SessionMessage::Stop { reason, reply } => self.on_stop(reason, reply).await,
            SessionMessage::SetVolume { percent, reply } => {
                self.volume = percent.min(100);
                if let Some(connection) = &self.connection {
                    connection.set_volume(self.volume);
                }
                let _ = reply.send(Ok(()));
            }
            SessionMessage::ListenersChanged { listeners } => self.on_listeners_changed(listeners),
            SessionMessage::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionMessage::Shutdown { reason, reply } => {
                // run() intercepts shutdown before dispatch.
                self.shutdown(reason).await;
                let _ = reply.send(());
            }
            SessionMessage::ConnectResolved { attempt, result } => {
                self.on_connect_resolved(attempt, result).await
            }
            SessionMessage::TrackEnded { generation, error } => {
                self.on_track_ended(generation, error)
            }
            SessionMessage::TransportLost { epoch, reason } => {
                self.on_transport_lost(epoch, reason).await
            }
            SessionMessage::WatchdogFired { arm_id } => self.on_watchdog_fired(arm_id).await,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            queue: self.queue.snapshot(),
            volume: self.volume,
            channel: self.connection.as_ref().map(|c| c.channel()),
            listeners: self.listeners,
            watchdog: self.watchdog.reason(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────

    fn check_capacity(&self, incoming: usize) -> PlaybackResult<()> {
        // The first parked track starts on connect instead of waiting in `pending`.
        let parked: usize = self
            .connecting
            .as_ref()
            .map(|c| {
                c.parked
                    .iter()
                    .map(|p| p.tracks.len())
                    .sum::<usize>()
                    .saturating_sub(1)
            })
            .unwrap_or(0);
        let max = self.deps.config.max_queue_len;
        if self.queue.pending_len() + parked + incoming > max {
            return Err(PlaybackError::QueueFull(max));
        }
        Ok(())
    }

    async fn on_play(
        &mut self,
        channel: ChannelId,
        tracks: Vec<Track>,
        reply: Reply<EnqueueOutcome>,
    ) {
        if tracks.is_empty() {
            let _ = reply.send(Err(PlaybackError::InvalidRequest(
                "nothing to play".to_string(),
            )));
            return;
        }
        // The first track may start straight away and never occupy a pending slot.
        let incoming = if self.state() == SessionState::Idle {
            tracks.len() - 1
        } else {
            tracks.len()
        };
        if let Err(e) = self.check_capacity(incoming) {
            let _ = reply.send(Err(e));
            return;
        }

        if let Some(connecting) = self.connecting.as_mut() {
            log::debug!(
                "[Session] Parking play in space {} until connect #{} resolves",
                self.space,
                connecting.attempt
            );
            connecting.parked.push(ParkedPlay { tracks, reply });
            return;
        }

        if self
            .connection
            .as_ref()
            .is_some_and(|c| !c.is_connected())
        {
            log::warn!(
                "[Session] Connection for space {} is dead, reconnecting",
                self.space
            );
            self.release_connection().await;
        }

        if self.connection.is_none() {
            self.begin_connect(channel, ParkedPlay { tracks, reply });
            return;
        }

        if let Err(e) = self.move_if_needed(&channel).await {
            let _ = reply.send(Err(e));
            return;
        }

        self.enqueue_batches(vec![ParkedPlay { tracks, reply }]);
    }

    async fn move_if_needed(&mut self, channel: &ChannelId) -> PlaybackResult<()> {
        let Some(connection) = self.connection.as_ref() else {
            return Ok(());
        };
        let from = connection.channel();
        if &from == channel {
            return Ok(());
        }

        match connection.move_to(channel).await {
            Ok(()) => {
                log::info!(
                    "[Session] Moved space {} from {} to {}",
                    self.space,
                    from,
                    channel
                );
                self.emit(SessionEvent::Moved {
                    space: self.space.clone(),
                    from,
                    to: channel.clone(),
                    timestamp: now_millis(),
                });
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "[Session] Move to {} failed in space {}: {}",
                    channel,
                    self.space,
                    e
                );
                Err(PlaybackError::ConnectFailed {
                    attempts: 1,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn on_pause(&mut self) -> PlaybackResult<()> {
        if self.state() != SessionState::Playing {
            return Err(PlaybackError::NothingPlaying);
        }
        let Some(connection) = &self.connection else {
            return Err(PlaybackError::NothingPlaying);
        };
        connection.pause();
        self.queue.pause();
        log::info!("[Session] Paused space {}", self.space);
        self.emit(SessionEvent::Paused {
            space: self.space.clone(),
            timestamp: now_millis(),
        });
        Ok(())
    }

    fn on_resume(&mut self) -> PlaybackResult<()> {
        if self.state() != SessionState::Paused {
            return Err(PlaybackError::NothingPaused);
        }
        let Some(connection) = &self.connection else {
            return Err(PlaybackError::NothingPaused);
        };
        connection.resume();
        self.queue.resume();
        log::info!("[Session] Resumed space {}", self.space);
        self.emit(SessionEvent::Resumed {
            space: self.space.clone(),
            timestamp: now_millis(),
        });
        Ok(())
    }

    fn on_skip(&mut self) -> PlaybackResult<()> {
        if !matches!(self.state(), SessionState::Playing | SessionState::Paused) {
            return Err(PlaybackError::NothingPlaying);
        }

        // Supersede first so the finish callback stop() triggers is stale.
        self.generation += 1;
        if let Some(connection) = &self.connection {
            connection.stop();
        }
        if let Some(track) = self.queue.finish_current() {
            log::info!("[Session] Skipped '{}' in space {}", track.title, self.space);
            self.emit(SessionEvent::TrackFinished {
                space: self.space.clone(),
                track,
                generation: self.generation - 1,
                error: None,
                timestamp: now_millis(),
            });
        }
        self.advance();
        Ok(())
    }

    async fn on_stop(&mut self, reason: DisconnectReason, reply: Reply<()>) {
        if let Some(connecting) = self.connecting.as_mut() {
            log::info!(
                "[Session] Stop during connect #{} in space {}, applying once it resolves",
                connecting.attempt,
                self.space
            );
            connecting.stop = Some(reason);
            let _ = reply.send(Ok(()));
            return;
        }
        self.teardown(reason).await;
        let _ = reply.send(Ok(()));
    }

    fn on_listeners_changed(&mut self, listeners: usize) {
        self.listeners = Some(listeners);
        if self.connection.is_none() {
            return;
        }

        if listeners == 0 {
            if self.watchdog.reason() != Some(WatchdogReason::Alone) {
                log::info!(
                    "[Session] Alone in channel in space {}, disconnecting in {:?}",
                    self.space,
                    self.deps.config.alone_timeout()
                );
                self.arm_watchdog(WatchdogReason::Alone);
            }
        } else if self.watchdog.reason() == Some(WatchdogReason::Alone) {
            self.watchdog.disarm();
            self.arm_idle_if_drained();
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connect
    // ─────────────────────────────────────────────────────────────────────

    fn transport_sink(&self, epoch: u64) -> TransportEventSink {
        let weak = self.self_tx.clone();
        Arc::new(move |event| {
            let TransportEvent::Disconnected { reason } = event;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(SessionMessage::TransportLost { epoch, reason });
            }
        })
    }

    fn begin_connect(&mut self, channel: ChannelId, first: ParkedPlay) {
        let attempt = self.next_attempt;
        self.next_attempt += 1;

        log::info!(
            "[Session] Connecting to {} in space {} (connect #{})",
            channel,
            self.space,
            attempt
        );
        self.emit(SessionEvent::Connecting {
            space: self.space.clone(),
            channel: channel.clone(),
            timestamp: now_millis(),
        });

        let transport = self.deps.transport.clone();
        let emitter = self.deps.emitter.clone();
        let policy = RetryPolicy::from_config(&self.deps.config);
        let settle = self.deps.config.settle_delay();
        let events = self.transport_sink(attempt);
        let weak = self.self_tx.clone();
        let space = self.space.clone();
        let target = channel.clone();

        self.deps.spawner.spawn(async move {
            let on_orphan = || {
                emitter.emit_session(SessionEvent::OrphanReleased {
                    space: space.clone(),
                    timestamp: now_millis(),
                });
            };
            let result =
                connect_with_retry(transport.as_ref(), &space, &target, policy, events, &on_orphan)
                    .await;
            if result.is_ok() && !settle.is_zero() {
                tokio::time::sleep(settle).await;
            }

            let message = SessionMessage::ConnectResolved { attempt, result };
            let undelivered = match weak.upgrade() {
                Some(tx) => tx.send(message).err().map(|e| e.0),
                None => Some(message),
            };
            // Session is gone; do not leak the connection.
            if let Some(SessionMessage::ConnectResolved {
                result: Ok(connection),
                ..
            }) = undelivered
            {
                log::warn!(
                    "[Session] Space {} closed during connect, releasing connection",
                    space
                );
                connection.disconnect().await;
            }
        });

        self.connecting = Some(ConnectInFlight {
            attempt,
            channel,
            parked: vec![first],
            stop: None,
        });
    }

    async fn on_connect_resolved(
        &mut self,
        attempt: u64,
        result: Result<Box<dyn VoiceConnection>, ConnectFailure>,
    ) {
        let in_flight = match self.connecting.take() {
            Some(c) if c.attempt == attempt => c,
            other => {
                self.connecting = other;
                log::debug!(
                    "[Session] Ignoring stale connect #{} in space {}",
                    attempt,
                    self.space
                );
                if let Ok(connection) = result {
                    connection.disconnect().await;
                }
                return;
            }
        };

        if let Some(reason) = in_flight.stop {
            if let Ok(connection) = result {
                self.connection = Some(connection);
                self.connection_epoch = attempt;
            }
            for parked in in_flight.parked {
                let _ = parked.reply.send(Err(PlaybackError::Cancelled));
            }
            self.teardown(reason).await;
            return;
        }

        match result {
            Ok(connection) => {
                log::info!(
                    "[Session] Connected to {} in space {}",
                    in_flight.channel,
                    self.space
                );
                connection.set_volume(self.volume);
                self.connection = Some(connection);
                self.connection_epoch = attempt;
                self.emit(SessionEvent::Connected {
                    space: self.space.clone(),
                    channel: in_flight.channel,
                    timestamp: now_millis(),
                });
                self.enqueue_batches(in_flight.parked);
                if self.listeners == Some(0) {
                    log::info!(
                        "[Session] Connected alone in space {}, disconnecting in {:?}",
                        self.space,
                        self.deps.config.alone_timeout()
                    );
                    self.arm_watchdog(WatchdogReason::Alone);
                }
            }
            Err(failure) => {
                log::warn!(
                    "[Session] Connect failed for space {} after {} attempt(s): {}",
                    self.space,
                    failure.attempts,
                    failure.last_error
                );
                self.emit(SessionEvent::ConnectFailed {
                    space: self.space.clone(),
                    attempts: failure.attempts,
                    error: failure.last_error.to_string(),
                    timestamp: now_millis(),
                });
                let error = PlaybackError::from(failure);
                for parked in in_flight.parked {
                    let _ = parked.reply.send(Err(error.clone()));
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Playback
    // ─────────────────────────────────────────────────────────────────────

    /// Appends each batch to `pending`, starts playback if idle and replies
    /// to every caller with the fate of its first track.
    fn enqueue_batches(&mut self, batches: Vec<ParkedPlay>) {
        let was_idle = self.queue.current().is_none();
        let base = self.queue.pending_len();

        let mut requests = Vec::with_capacity(batches.len());
        let mut offset = base;
        for batch in batches {
            let first_index = offset;
            offset += batch.tracks.len();
            let first = batch.tracks[0].clone();
            for track in batch.tracks {
                self.queue.enqueue(track);
            }
            requests.push((first_index, first, batch.reply));
        }

        let report = if was_idle {
            self.start_next()
        } else {
            StartReport::default()
        };
        let consumed = report.consumed();

        for (index, track, reply) in requests {
            let outcome = if index >= consumed {
                Ok(EnqueueOutcome {
                    started_immediately: false,
                    track,
                    queue_position: index - consumed + 1,
                })
            } else if index < report.failed.len() {
                Err(PlaybackError::PlaybackFailed(report.failed[index].to_string()))
            } else {
                Ok(EnqueueOutcome {
                    started_immediately: true,
                    track,
                    queue_position: 0,
                })
            };
            let _ = reply.send(outcome);
        }

        if was_idle && report.started.is_none() {
            self.on_drained();
        }
    }

    fn finish_callback(&self, generation: u64) -> FinishCallback {
        let weak = self.self_tx.clone();
        Box::new(move |error| {
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(SessionMessage::TrackEnded { generation, error });
            }
        })
    }

    /// Starts the head of `pending`, skipping tracks the transport refuses.
    fn start_next(&mut self) -> StartReport {
        let mut report = StartReport::default();
        if self.connection.is_none() {
            return report;
        }

        while let Some(track) = self.queue.take_next() {
            self.generation += 1;
            let generation = self.generation;
            let callback = self.finish_callback(generation);

            let Some(connection) = self.connection.as_ref() else {
                break;
            };
            match connection.play(&track, self.volume, callback) {
                Ok(()) => {
                    if self.watchdog.reason() == Some(WatchdogReason::Idle) {
                        self.watchdog.disarm();
                    }
                    log::info!(
                        "[Session] Now playing '{}' in space {}",
                        track.title,
                        self.space
                    );
                    self.queue.start(track.clone());
                    self.emit(SessionEvent::TrackStarted {
                        space: self.space.clone(),
                        track: track.clone(),
                        generation,
                        timestamp: now_millis(),
                    });
                    report.started = Some(track);
                    return report;
                }
                Err(e) => {
                    log::warn!(
                        "[Session] Failed to start '{}' in space {}: {}",
                        track.title,
                        self.space,
                        e
                    );
                    self.emit(SessionEvent::TrackFinished {
                        space: self.space.clone(),
                        track,
                        generation,
                        error: Some(e.to_string()),
                        timestamp: now_millis(),
                    });
                    report.failed.push(e);
                }
            }
        }
        report
    }

    /// Moves on after the current track ended or was skipped.
    fn advance(&mut self) {
        if self.start_next().started.is_none() {
            self.on_drained();
        }
    }

    fn on_drained(&mut self) {
        log::info!("[Session] Queue drained in space {}", self.space);
        self.emit(SessionEvent::QueueDrained {
            space: self.space.clone(),
            timestamp: now_millis(),
        });
        self.arm_idle_if_drained();
    }

    fn on_track_ended(&mut self, generation: u64, error: Option<TransportError>) {
        if generation != self.generation || self.queue.current().is_none() {
            log::debug!(
                "[Session] Discarding stale finish (generation {}, current {}) in space {}",
                generation,
                self.generation,
                self.space
            );
            return;
        }

        self.generation += 1;
        if let Some(track) = self.queue.finish_current() {
            match &error {
                Some(e) => log::warn!(
                    "[Session] Playback error on '{}' in space {}: {}",
                    track.title,
                    self.space,
                    e
                ),
                None => log::debug!(
                    "[Session] Finished '{}' in space {}",
                    track.title,
                    self.space
                ),
            }
            self.emit(SessionEvent::TrackFinished {
                space: self.space.clone(),
                track,
                generation,
                error: error.map(|e| e.to_string()),
                timestamp: now_millis(),
            });
        }
        self.advance();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Watchdog
    // ─────────────────────────────────────────────────────────────────────

    fn arm_watchdog(&mut self, reason: WatchdogReason) {
        let duration = match reason {
            WatchdogReason::Idle => self.deps.config.idle_timeout(),
            WatchdogReason::Alone => self.deps.config.alone_timeout(),
        };
        let weak = self.self_tx.clone();
        self.watchdog
            .arm(&self.deps.spawner, duration, reason, move |arm_id| {
                if let Some(tx) = weak.upgrade() {
                    let _ = tx.send(SessionMessage::WatchdogFired { arm_id });
                }
            });
    }

    fn arm_idle_if_drained(&mut self) {
        if self.connection.is_some()
            && self.state() == SessionState::Idle
            && self.queue.is_drained()
            && self.watchdog.reason() != Some(WatchdogReason::Alone)
        {
            self.arm_watchdog(WatchdogReason::Idle);
        }
    }

    async fn on_watchdog_fired(&mut self, arm_id: u64) {
        let Some(reason) = self.watchdog.claim(arm_id) else {
            log::debug!(
                "[Watchdog] Ignoring superseded timer #{} in space {}",
                arm_id,
                self.space
            );
            return;
        };

        let still_holds = self.connection.is_some()
            && match reason {
                WatchdogReason::Idle => {
                    self.state() == SessionState::Idle && self.queue.is_drained()
                }
                WatchdogReason::Alone => self.listeners == Some(0),
            };
        if !still_holds {
            log::debug!(
                "[Watchdog] {:?} condition no longer holds in space {}",
                reason,
                self.space
            );
            return;
        }

        log::info!(
            "[Watchdog] {:?} timeout reached in space {}, disconnecting",
            reason,
            self.space
        );
        let reason = match reason {
            WatchdogReason::Idle => DisconnectReason::IdleTimeout,
            WatchdogReason::Alone => DisconnectReason::Alone,
        };
        self.teardown(reason).await;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────

    async fn on_transport_lost(&mut self, epoch: u64, reason: String) {
        if self.connection.is_none() || epoch != self.connection_epoch {
            log::debug!(
                "[Session] Ignoring disconnect for superseded connection in space {}",
                self.space
            );
            return;
        }

        log::warn!(
            "[Session] Transport lost in space {}: {}",
            self.space,
            reason
        );
        self.generation += 1;
        self.watchdog.disarm();
        self.queue.clear();
        self.connection = None;
        self.deps.transport.cleanup_partial(&self.space).await;
        self.emit(SessionEvent::Disconnected {
            space: self.space.clone(),
            reason: DisconnectReason::TransportLost,
            timestamp: now_millis(),
        });
    }

    /// Disconnects and releases the transport resource, if one is held.
    async fn release_connection(&mut self) -> bool {
        let Some(connection) = self.connection.take() else {
            return false;
        };
        connection.stop();
        connection.disconnect().await;
        if self.deps.transport.has_resource(&self.space) {
            self.deps.transport.cleanup_partial(&self.space).await;
        }
        true
    }

    /// Returns the session to a clean Idle state with no transport resource.
    async fn teardown(&mut self, reason: DisconnectReason) {
        self.generation += 1;
        self.watchdog.disarm();
        self.queue.clear();

        if self.release_connection().await {
            log::info!(
                "[Session] Disconnected from space {} ({:?})",
                self.space,
                reason
            );
            self.emit(SessionEvent::Disconnected {
                space: self.space.clone(),
                reason,
                timestamp: now_millis(),
            });
        }
    }

    async fn shutdown(&mut self, reason: DisconnectReason) {
        if let Some(in_flight) = self.connecting.take() {
            for parked in in_flight.parked {
                let _ = parked.reply.send(Err(PlaybackError::Cancelled));
            }
        }
        // Dropping deferred replies reports SessionUnavailable to their callers.
        self.deferred.clear();
        self.teardown(reason).await;
        log::debug!("[Session] Session for space {} stopped", self.space);
    }
}
