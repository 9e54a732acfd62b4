//! Volatile playlist store.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Playlist, PlaylistError, PlaylistId, PlaylistResult, PlaylistStore};
use crate::types::{SpaceId, Track, UserId};
use crate::utils::now_millis;

/// Playlist store kept entirely in memory.
///
/// Ids increase monotonically and are never reused within a process.
pub struct InMemoryPlaylistStore {
    playlists: DashMap<PlaylistId, Playlist>,
    next_id: AtomicU64,
}

impl Default for InMemoryPlaylistStore {
    fn default() -> Self {
        Self {
            playlists: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryPlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlaylistStore for InMemoryPlaylistStore {
    async fn create(
        &self,
        space: &SpaceId,
        owner: &UserId,
        name: &str,
    ) -> PlaylistResult<Playlist> {
        let id = PlaylistId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let playlist = Playlist {
            id,
            space: space.clone(),
            owner: owner.clone(),
            name: name.to_string(),
            tracks: Vec::new(),
            created_at: now_millis(),
        };
        self.playlists.insert(id, playlist.clone());
        Ok(playlist)
    }

    async fn get(&self, space: &SpaceId, id: PlaylistId) -> PlaylistResult<Playlist> {
        self.playlists
            .get(&id)
            .filter(|p| &p.space == space)
            .map(|p| p.clone())
            .ok_or(PlaylistError::NotFound(id))
    }

    async fn list_for_owner(
        &self,
        space: &SpaceId,
        owner: &UserId,
    ) -> PlaylistResult<Vec<Playlist>> {
        let mut playlists: Vec<Playlist> = self
            .playlists
            .iter()
            .filter(|p| &p.space == space && &p.owner == owner)
            .map(|p| p.clone())
            .collect();
        playlists.sort_by_key(|p| p.id);
        Ok(playlists)
    }

    async fn add_track(
        &self,
        space: &SpaceId,
        id: PlaylistId,
        track: Track,
    ) -> PlaylistResult<Playlist> {
        let mut entry = self
            .playlists
            .get_mut(&id)
            .filter(|p| &p.space == space)
            .ok_or(PlaylistError::NotFound(id))?;
        entry.tracks.push(track);
        Ok(entry.clone())
    }

    async fn remove_track(
        &self,
        space: &SpaceId,
        id: PlaylistId,
        index: usize,
    ) -> PlaylistResult<Option<Track>> {
        let mut entry = self
            .playlists
            .get_mut(&id)
            .filter(|p| &p.space == space)
            .ok_or(PlaylistError::NotFound(id))?;
        if index >= entry.tracks.len() {
            return Ok(None);
        }
        Ok(Some(entry.tracks.remove(index)))
    }

    async fn delete(&self, space: &SpaceId, id: PlaylistId) -> PlaylistResult<()> {
        self.playlists
            .remove_if(&id, |_, p| &p.space == space)
            .map(|_| ())
            .ok_or(PlaylistError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::conformance;

    #[tokio::test]
    async fn in_memory_store_conforms() {
        conformance::exercise(&InMemoryPlaylistStore::new()).await;
    }
}
