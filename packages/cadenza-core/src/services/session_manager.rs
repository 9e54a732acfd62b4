//! Command API consumed by front ends.
//!
//! Responsibilities:
//! - Resolve play queries before any session is touched
//! - Route commands to the per-space session actor
//! - Playlist management with ownership checks
//! - Startup reconciliation of orphaned transport resources
//! - Space removal and process shutdown

use std::sync::Arc;

use super::queue::QueueSnapshot;
use super::session::{EnqueueOutcome, SessionDeps, SessionHandle, SessionSnapshot};
use super::session_registry::SessionRegistry;
use crate::error::{PlaybackError, PlaybackResult};
use crate::events::{DisconnectReason, PlaylistEvent, SessionEvent};
use crate::playlist::{storable, Playlist, PlaylistId, PlaylistStore};
use crate::resolver::{resolve_query, TrackResolver};
use crate::state::Config;
use crate::types::{ChannelId, SpaceId, Track, UserId};
use crate::utils::now_millis;

/// Front-end facing service that owns every playback session.
pub struct SessionManager {
    registry: SessionRegistry,
    resolver: Arc<dyn TrackResolver>,
    /// `None` disables the playlist commands.
    playlists: Option<Arc<dyn PlaylistStore>>,
}

impl SessionManager {
    pub fn new(
        deps: SessionDeps,
        resolver: Arc<dyn TrackResolver>,
        playlists: Option<Arc<dyn PlaylistStore>>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(deps),
            resolver,
            playlists,
        }
    }

    pub fn config(&self) -> &Config {
        &self.registry.deps().config
    }

    /// Spaces that currently have a session.
    pub fn spaces(&self) -> Vec<SpaceId> {
        self.registry.spaces()
    }

    fn deps(&self) -> &SessionDeps {
        self.registry.deps()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Playback commands
    // ─────────────────────────────────────────────────────────────────────

    /// Resolves `query` and enqueues it, connecting to `channel` if needed.
    ///
    /// `channel` is the caller's current voice channel; `None` means the
    /// caller is not in one. Resolution failures never touch the session.
    pub async fn play(
        &self,
        space: &SpaceId,
        caller: &UserId,
        channel: Option<ChannelId>,
        query: &str,
    ) -> PlaybackResult<EnqueueOutcome> {
        let channel = require_channel(channel)?;
        if query.trim().is_empty() {
            return Err(PlaybackError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }

        let track = resolve_query(self.resolver.as_ref(), query)
            .await
            .map_err(|e| {
                log::warn!("[Session] Could not resolve '{}' in space {}: {}", query, space, e);
                PlaybackError::from(e)
            })?
            .requested_by(caller.clone());

        self.enqueue(space, channel, vec![track]).await
    }

    async fn enqueue(
        &self,
        space: &SpaceId,
        channel: ChannelId,
        tracks: Vec<Track>,
    ) -> PlaybackResult<EnqueueOutcome> {
        let handle = self.registry.get_or_create(space);
        match handle.play(channel.clone(), tracks.clone()).await {
            Err(PlaybackError::SessionUnavailable) => {
                // The actor exited between lookup and send; a fresh one takes over.
                self.registry.get_or_create(space).play(channel, tracks).await
            }
            other => other,
        }
    }

    pub async fn pause(&self, space: &SpaceId) -> PlaybackResult<()> {
        self.existing(space, PlaybackError::NothingPlaying)?
            .pause()
            .await
    }

    pub async fn resume(&self, space: &SpaceId) -> PlaybackResult<()> {
        self.existing(space, PlaybackError::NothingPaused)?
            .resume()
            .await
    }

    pub async fn skip(&self, space: &SpaceId) -> PlaybackResult<()> {
        self.existing(space, PlaybackError::NothingPlaying)?
            .skip()
            .await
    }

    /// Clears the queue and disconnects. Succeeds when there is nothing to stop.
    pub async fn stop(&self, space: &SpaceId) -> PlaybackResult<()> {
        match self.registry.get(space) {
            Some(handle) => match handle.stop().await {
                Err(PlaybackError::SessionUnavailable) => Ok(()),
                other => other,
            },
            None => Ok(()),
        }
    }

    pub async fn queue_snapshot(&self, space: &SpaceId) -> QueueSnapshot {
        self.session_snapshot(space)
            .await
            .map(|s| s.queue)
            .unwrap_or_default()
    }

    /// Full session view, or `None` if the space has no session.
    pub async fn session_snapshot(&self, space: &SpaceId) -> Option<SessionSnapshot> {
        self.registry.get(space)?.snapshot().await.ok()
    }

    /// Sets the session volume in percent.
    pub async fn set_volume(&self, space: &SpaceId, percent: u8) -> PlaybackResult<()> {
        if percent > 100 {
            return Err(PlaybackError::InvalidRequest(format!(
                "volume must be between 0 and 100, got {}",
                percent
            )));
        }
        self.registry.get_or_create(space).set_volume(percent).await
    }

    pub async fn volume(&self, space: &SpaceId) -> u8 {
        match self.session_snapshot(space).await {
            Some(snapshot) => snapshot.volume,
            None => self.config().default_volume,
        }
    }

    /// Reports voice-channel occupancy for the bot's channel in `space`.
    pub fn listeners_changed(&self, space: &SpaceId, listeners: usize) {
        if let Some(handle) = self.registry.get(space) {
            let _ = handle.listeners_changed(listeners);
        }
    }

    fn existing(&self, space: &SpaceId, absent: PlaybackError) -> PlaybackResult<SessionHandle> {
        self.registry.get(space).ok_or(absent)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Releases transport resources left behind by a previous run.
    ///
    /// Call once at startup, before accepting commands. Returns how many
    /// orphaned resources were released.
    pub async fn reconcile(&self) -> usize {
        let transport = &self.deps().transport;
        let mut released = 0;
        for space in transport.active_spaces() {
            if self.registry.contains(&space) {
                continue;
            }
            log::warn!(
                "[Registry] Releasing orphaned voice connection in space {}",
                space
            );
            transport.cleanup_partial(&space).await;
            self.deps().emitter.emit_session(SessionEvent::OrphanReleased {
                space,
                timestamp: now_millis(),
            });
            released += 1;
        }
        if released > 0 {
            log::info!("[Registry] Reconciled {} orphaned connection(s)", released);
        }
        released
    }

    /// The bot left `space`: tear its session down and forget it.
    pub async fn guild_removed(&self, space: &SpaceId) {
        if let Some(handle) = self.registry.remove(space) {
            log::info!("[Registry] Space {} removed, dropping its session", space);
            handle.shutdown(DisconnectReason::SpaceRemoved).await;
        }
    }

    /// Tears down every session and cancels background work.
    pub async fn shutdown(&self) {
        let handles = self.registry.drain();
        log::info!("[Registry] Shutting down {} session(s)", handles.len());
        futures::future::join_all(
            handles
                .iter()
                .map(|h| h.shutdown(DisconnectReason::Shutdown)),
        )
        .await;
        self.deps().shutdown.cancel();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Playlists
    // ─────────────────────────────────────────────────────────────────────

    fn store(&self) -> PlaybackResult<&Arc<dyn PlaylistStore>> {
        self.playlists
            .as_ref()
            .ok_or_else(|| PlaybackError::InvalidRequest("playlists unavailable".to_string()))
    }

    async fn owned_playlist(
        &self,
        space: &SpaceId,
        owner: &UserId,
        id: PlaylistId,
    ) -> PlaybackResult<Playlist> {
        let playlist = self.store()?.get(space, id).await?;
        if &playlist.owner != owner {
            return Err(PlaybackError::PermissionDenied(format!(
                "playlist {} belongs to someone else",
                id
            )));
        }
        Ok(playlist)
    }

    pub async fn create_playlist(
        &self,
        space: &SpaceId,
        owner: &UserId,
        name: &str,
    ) -> PlaybackResult<Playlist> {
        let name = name.trim();
        let max = self.config().max_playlist_name_len;
        if name.is_empty() {
            return Err(PlaybackError::InvalidRequest(
                "playlist name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > max {
            return Err(PlaybackError::InvalidRequest(format!(
                "playlist name must be at most {} characters",
                max
            )));
        }

        let playlist = self.store()?.create(space, owner, name).await?;
        log::info!(
            "[Playlist] {} created playlist {} '{}' in space {}",
            owner,
            playlist.id,
            playlist.name,
            space
        );
        self.deps().emitter.emit_playlist(PlaylistEvent::Created {
            space: space.clone(),
            playlist_id: playlist.id,
            name: playlist.name.clone(),
            timestamp: now_millis(),
        });
        Ok(playlist)
    }

    pub async fn list_playlists(
        &self,
        space: &SpaceId,
        owner: &UserId,
    ) -> PlaybackResult<Vec<Playlist>> {
        Ok(self.store()?.list_for_owner(space, owner).await?)
    }

    pub async fn show_playlist(&self, space: &SpaceId, id: PlaylistId) -> PlaybackResult<Playlist> {
        Ok(self.store()?.get(space, id).await?)
    }

    /// Enqueues every track of a playlist, attributed to `caller`.
    pub async fn play_playlist(
        &self,
        space: &SpaceId,
        caller: &UserId,
        channel: Option<ChannelId>,
        id: PlaylistId,
    ) -> PlaybackResult<EnqueueOutcome> {
        let channel = require_channel(channel)?;
        let playlist = self.store()?.get(space, id).await?;
        if playlist.tracks.is_empty() {
            return Err(PlaybackError::InvalidRequest(format!(
                "playlist '{}' is empty",
                playlist.name
            )));
        }

        log::info!(
            "[Playlist] Queuing {} track(s) from '{}' in space {}",
            playlist.tracks.len(),
            playlist.name,
            space
        );
        let tracks = playlist
            .tracks
            .into_iter()
            .map(|t| t.requested_by(caller.clone()))
            .collect();
        self.enqueue(space, channel, tracks).await
    }

    /// Saves the currently playing track to one of `owner`'s playlists.
    pub async fn add_current_to_playlist(
        &self,
        space: &SpaceId,
        owner: &UserId,
        id: PlaylistId,
    ) -> PlaybackResult<Track> {
        self.owned_playlist(space, owner, id).await?;
        let current = self
            .session_snapshot(space)
            .await
            .and_then(|s| s.queue.current)
            .ok_or(PlaybackError::NothingPlaying)?;

        let track = storable(&current);
        let playlist = self.store()?.add_track(space, id, track.clone()).await?;
        self.deps().emitter.emit_playlist(PlaylistEvent::Updated {
            space: space.clone(),
            playlist_id: id,
            track_count: playlist.tracks.len(),
            timestamp: now_millis(),
        });
        Ok(track)
    }

    /// Removes the track at 1-based `number`.
    pub async fn remove_from_playlist(
        &self,
        space: &SpaceId,
        owner: &UserId,
        id: PlaylistId,
        number: usize,
    ) -> PlaybackResult<Track> {
        let playlist = self.owned_playlist(space, owner, id).await?;
        let out_of_range = || {
            PlaybackError::InvalidRequest(format!(
                "playlist '{}' has no track #{}",
                playlist.name, number
            ))
        };
        if number == 0 {
            return Err(out_of_range());
        }

        let removed = self
            .store()?
            .remove_track(space, id, number - 1)
            .await?
            .ok_or_else(out_of_range)?;
        self.deps().emitter.emit_playlist(PlaylistEvent::Updated {
            space: space.clone(),
            playlist_id: id,
            track_count: playlist.tracks.len().saturating_sub(1),
            timestamp: now_millis(),
        });
        Ok(removed)
    }

    pub async fn delete_playlist(
        &self,
        space: &SpaceId,
        owner: &UserId,
        id: PlaylistId,
    ) -> PlaybackResult<()> {
        self.owned_playlist(space, owner, id).await?;
        self.store()?.delete(space, id).await?;
        log::info!("[Playlist] Deleted playlist {} in space {}", id, space);
        self.deps().emitter.emit_playlist(PlaylistEvent::Deleted {
            space: space.clone(),
            playlist_id: id,
            timestamp: now_millis(),
        });
        Ok(())
    }
}

fn require_channel(channel: Option<ChannelId>) -> PlaybackResult<ChannelId> {
    channel
        .filter(|c| !c.as_str().is_empty())
        .ok_or(PlaybackError::NotInChannel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventEmitter;
    use crate::playlist::InMemoryPlaylistStore;
    use crate::resolver::test_fixtures::MockResolver;
    use crate::resolver::ResolveError;
    use crate::runtime::TokioSpawner;
    use crate::transport::test_fixtures::MockTransport;
    use crate::transport::{TransportError, VoiceTransport};
    use std::sync::atomic::Ordering;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        manager: SessionManager,
        transport: MockTransport,
        resolver: Arc<MockResolver>,
    }

    fn fixture() -> Fixture {
        let transport = MockTransport::new();
        let resolver = Arc::new(MockResolver::new());
        let deps = SessionDeps {
            config: Arc::new(Config::default()),
            transport: Arc::new(transport.clone()),
            emitter: Arc::new(NoopEventEmitter),
            spawner: TokioSpawner::current(),
            shutdown: CancellationToken::new(),
        };
        let manager = SessionManager::new(
            deps,
            resolver.clone(),
            Some(Arc::new(InMemoryPlaylistStore::new())),
        );
        Fixture {
            manager,
            transport,
            resolver,
        }
    }

    fn g1() -> SpaceId {
        SpaceId::new("g1")
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn c1() -> Option<ChannelId> {
        Some(ChannelId::new("c1"))
    }

    #[tokio::test(start_paused = true)]
    async fn play_resolves_and_attributes_requester() {
        let f = fixture();
        let outcome = f
            .manager
            .play(&g1(), &alice(), c1(), "never gonna give you up")
            .await
            .unwrap();

        assert!(outcome.started_immediately);
        assert_eq!(outcome.track.title, "never gonna give you up");
        assert_eq!(outcome.track.requester, Some(alice()));
        assert_eq!(f.resolver.search_calls.load(Ordering::SeqCst), 1);

        let snapshot = f.manager.queue_snapshot(&g1()).await;
        assert_eq!(snapshot.current.unwrap().title, "never gonna give you up");
    }

    #[tokio::test(start_paused = true)]
    async fn play_requires_a_channel() {
        let f = fixture();
        for channel in [None, Some(ChannelId::new(""))] {
            let err = f
                .manager
                .play(&g1(), &alice(), channel, "song")
                .await
                .unwrap_err();
            assert_eq!(err, PlaybackError::NotInChannel);
        }
        assert_eq!(f.transport.connect_calls(), 0);
        assert_eq!(f.resolver.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_failure_leaves_queue_untouched() {
        let f = fixture();
        f.manager.play(&g1(), &alice(), c1(), "first").await.unwrap();
        f.manager.play(&g1(), &alice(), c1(), "second").await.unwrap();
        let before = f.manager.queue_snapshot(&g1()).await;

        f.resolver
            .fail("broken", ResolveError::Failed("video unavailable".into()));
        let err = f
            .manager
            .play(&g1(), &alice(), c1(), "broken")
            .await
            .unwrap_err();

        assert!(matches!(err, PlaybackError::ResolveFailed(_)));
        assert_eq!(f.manager.queue_snapshot(&g1()).await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_failure_on_fresh_space_never_connects() {
        let f = fixture();
        f.resolver.fail("nope", ResolveError::Incomplete);
        assert!(f.manager.play(&g1(), &alice(), c1(), "nope").await.is_err());
        assert_eq!(f.transport.connect_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn permission_denied_connect_is_reported_as_such() {
        let f = fixture();
        f.transport
            .script_connects([Err(TransportError::PermissionDenied("CONNECT".into()))]);

        let err = f
            .manager
            .play(&g1(), &alice(), c1(), "song")
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::PermissionDenied(_)));
        // Not retried.
        assert_eq!(f.transport.connect_calls(), 1);
    }

    #[tokio::test]
    async fn commands_without_a_session() {
        let f = fixture();
        assert_eq!(
            f.manager.pause(&g1()).await,
            Err(PlaybackError::NothingPlaying)
        );
        assert_eq!(
            f.manager.resume(&g1()).await,
            Err(PlaybackError::NothingPaused)
        );
        assert_eq!(
            f.manager.skip(&g1()).await,
            Err(PlaybackError::NothingPlaying)
        );
        assert_eq!(f.manager.stop(&g1()).await, Ok(()));
        assert_eq!(f.manager.queue_snapshot(&g1()).await, QueueSnapshot::default());
        assert!(f.manager.spaces().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_are_independent() {
        let f = fixture();
        let g2 = SpaceId::new("g2");
        f.manager.play(&g1(), &alice(), c1(), "a").await.unwrap();
        f.manager.play(&g2, &alice(), c1(), "b").await.unwrap();

        f.manager.stop(&g1()).await.unwrap();
        assert!(f.manager.queue_snapshot(&g1()).await.current.is_none());
        assert_eq!(
            f.manager.queue_snapshot(&g2).await.current.unwrap().title,
            "b"
        );
    }

    #[tokio::test]
    async fn volume_is_validated_and_defaults() {
        let f = fixture();
        assert_eq!(f.manager.volume(&g1()).await, 50);
        assert!(matches!(
            f.manager.set_volume(&g1(), 101).await,
            Err(PlaybackError::InvalidRequest(_))
        ));
        f.manager.set_volume(&g1(), 25).await.unwrap();
        assert_eq!(f.manager.volume(&g1()).await, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_releases_only_unowned_resources() {
        let f = fixture();
        f.transport.seed_stale_resource(&SpaceId::new("crashed"));
        f.manager.play(&g1(), &alice(), c1(), "song").await.unwrap();

        assert_eq!(f.manager.reconcile().await, 1);
        assert!(!f.transport.has_resource(&SpaceId::new("crashed")));
        assert!(f.transport.has_resource(&g1()));
        assert_eq!(f.manager.reconcile().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn guild_removed_tears_down_and_forgets() {
        let f = fixture();
        f.manager.play(&g1(), &alice(), c1(), "song").await.unwrap();

        f.manager.guild_removed(&g1()).await;
        assert!(f.manager.spaces().is_empty());
        assert!(!f.transport.has_resource(&g1()));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_everything() {
        let f = fixture();
        f.manager.play(&g1(), &alice(), c1(), "a").await.unwrap();
        f.manager
            .play(&SpaceId::new("g2"), &alice(), c1(), "b")
            .await
            .unwrap();

        f.manager.shutdown().await;
        assert!(f.manager.spaces().is_empty());
        assert!(f.transport.active_spaces().is_empty());
        assert!(f.manager.deps().shutdown.is_cancelled());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Playlists
    // ─────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn playlist_names_are_validated() {
        let f = fixture();
        let too_long = "x".repeat(51);
        for name in ["", "   ", too_long.as_str()] {
            assert!(matches!(
                f.manager.create_playlist(&g1(), &alice(), name).await,
                Err(PlaybackError::InvalidRequest(_))
            ));
        }
        let created = f
            .manager
            .create_playlist(&g1(), &alice(), "  Chill  ")
            .await
            .unwrap();
        assert_eq!(created.name, "Chill");
    }

    #[tokio::test(start_paused = true)]
    async fn add_current_then_play_playlist() {
        let f = fixture();
        let playlist = f
            .manager
            .create_playlist(&g1(), &alice(), "Mix")
            .await
            .unwrap();

        assert_eq!(
            f.manager
                .add_current_to_playlist(&g1(), &alice(), playlist.id)
                .await,
            Err(PlaybackError::NothingPlaying)
        );

        f.manager.play(&g1(), &alice(), c1(), "one").await.unwrap();
        let saved = f
            .manager
            .add_current_to_playlist(&g1(), &alice(), playlist.id)
            .await
            .unwrap();
        assert_eq!(saved.title, "one");
        assert_eq!(saved.requester, None);

        f.manager.skip(&g1()).await.unwrap();
        let bob = UserId::new("bob");
        let outcome = f
            .manager
            .play_playlist(&g1(), &bob, c1(), playlist.id)
            .await
            .unwrap();
        assert!(outcome.started_immediately);
        assert_eq!(outcome.track.requester, Some(bob));
    }

    #[tokio::test]
    async fn only_the_owner_may_change_a_playlist() {
        let f = fixture();
        let bob = UserId::new("bob");
        let playlist = f
            .manager
            .create_playlist(&g1(), &alice(), "Mine")
            .await
            .unwrap();

        assert!(matches!(
            f.manager.delete_playlist(&g1(), &bob, playlist.id).await,
            Err(PlaybackError::PermissionDenied(_))
        ));
        assert!(matches!(
            f.manager
                .remove_from_playlist(&g1(), &bob, playlist.id, 1)
                .await,
            Err(PlaybackError::PermissionDenied(_))
        ));
        f.manager
            .delete_playlist(&g1(), &alice(), playlist.id)
            .await
            .unwrap();
        assert_eq!(
            f.manager.show_playlist(&g1(), playlist.id).await,
            Err(PlaybackError::PlaylistNotFound(playlist.id))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remove_uses_one_based_numbers() {
        let f = fixture();
        let playlist = f
            .manager
            .create_playlist(&g1(), &alice(), "Mix")
            .await
            .unwrap();
        for query in ["a", "b"] {
            f.manager.play(&g1(), &alice(), c1(), query).await.unwrap();
            f.manager
                .add_current_to_playlist(&g1(), &alice(), playlist.id)
                .await
                .unwrap();
            f.manager.skip(&g1()).await.unwrap();
        }

        for number in [0, 3] {
            assert!(matches!(
                f.manager
                    .remove_from_playlist(&g1(), &alice(), playlist.id, number)
                    .await,
                Err(PlaybackError::InvalidRequest(_))
            ));
        }
        let removed = f
            .manager
            .remove_from_playlist(&g1(), &alice(), playlist.id, 1)
            .await
            .unwrap();
        assert_eq!(removed.title, "a");
        let remaining = f.manager.show_playlist(&g1(), playlist.id).await.unwrap();
        assert_eq!(remaining.tracks.len(), 1);
        assert_eq!(remaining.tracks[0].title, "b");
    }

    #[tokio::test]
    async fn playlists_from_other_spaces_are_not_found() {
        let f = fixture();
        let playlist = f
            .manager
            .create_playlist(&g1(), &alice(), "Mine")
            .await
            .unwrap();
        let other = SpaceId::new("g2");

        assert_eq!(
            f.manager.show_playlist(&other, playlist.id).await,
            Err(PlaybackError::PlaylistNotFound(playlist.id))
        );
        assert_eq!(
            f.manager
                .play_playlist(&other, &alice(), c1(), playlist.id)
                .await,
            Err(PlaybackError::PlaylistNotFound(playlist.id))
        );
    }

    #[tokio::test]
    async fn empty_playlist_cannot_be_played() {
        let f = fixture();
        let playlist = f
            .manager
            .create_playlist(&g1(), &alice(), "Empty")
            .await
            .unwrap();
        assert!(matches!(
            f.manager
                .play_playlist(&g1(), &alice(), c1(), playlist.id)
                .await,
            Err(PlaybackError::InvalidRequest(_))
        ));
        assert_eq!(f.transport.connect_calls(), 0);
    }

    #[tokio::test]
    async fn playlists_can_be_disabled() {
        let transport = MockTransport::new();
        let deps = SessionDeps {
            config: Arc::new(Config::default()),
            transport: Arc::new(transport),
            emitter: Arc::new(NoopEventEmitter),
            spawner: TokioSpawner::current(),
            shutdown: CancellationToken::new(),
        };
        let manager = SessionManager::new(deps, Arc::new(MockResolver::new()), None);
        assert!(matches!(
            manager.list_playlists(&g1(), &alice()).await,
            Err(PlaybackError::InvalidRequest(_))
        ));
    }
}
