//! Playlist persistence boundary.
//!
//! Playlists are owned by one user inside one collaboration space and hold
//! `Track`-shaped records. Ownership rules live in the session manager; stores
//! only enforce that a playlist is looked up within its own space.

mod json_file;
mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use json_file::JsonFilePlaylistStore;
pub use memory::InMemoryPlaylistStore;

use crate::types::{SpaceId, Track, UserId};

/// Numeric playlist identifier, unique per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(pub u64);

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, ordered list of tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: PlaylistId,
    pub space: SpaceId,
    pub owner: UserId,
    pub name: String,
    pub tracks: Vec<Track>,
    /// Unix timestamp in milliseconds.
    pub created_at: u64,
}

/// Errors produced by playlist stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaylistError {
    /// No playlist with this id exists in the requested space.
    #[error("Playlist {0} not found")]
    NotFound(PlaylistId),

    /// Reading or writing the backing storage failed.
    #[error("Playlist storage I/O failed: {0}")]
    Io(String),

    /// The backing storage holds data that cannot be decoded.
    #[error("Playlist storage is corrupt: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for PlaylistError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for playlist store operations.
pub type PlaylistResult<T> = Result<T, PlaylistError>;

/// Persistent playlist storage keyed by collaboration space and owner.
#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// Creates an empty playlist.
    async fn create(&self, space: &SpaceId, owner: &UserId, name: &str)
        -> PlaylistResult<Playlist>;

    /// Fetches a playlist. A playlist from another space is `NotFound`.
    async fn get(&self, space: &SpaceId, id: PlaylistId) -> PlaylistResult<Playlist>;

    /// Lists `owner`'s playlists in `space`, oldest first.
    async fn list_for_owner(&self, space: &SpaceId, owner: &UserId)
        -> PlaylistResult<Vec<Playlist>>;

    /// Appends a track and returns the updated playlist.
    async fn add_track(
        &self,
        space: &SpaceId,
        id: PlaylistId,
        track: Track,
    ) -> PlaylistResult<Playlist>;

    /// Removes the track at zero-based `index`.
    ///
    /// Returns `None` when the index is out of range.
    async fn remove_track(
        &self,
        space: &SpaceId,
        id: PlaylistId,
        index: usize,
    ) -> PlaylistResult<Option<Track>>;

    /// Deletes a playlist.
    async fn delete(&self, space: &SpaceId, id: PlaylistId) -> PlaylistResult<()>;
}

/// Strips per-request data so a track can be stored in a playlist.
pub(crate) fn storable(track: &Track) -> Track {
    Track {
        requester: None,
        ..track.clone()
    }
}

/// Shared behaviour checks run against every store implementation.
#[cfg(test)]
pub(crate) mod conformance {
    use super::*;

    pub async fn exercise(store: &dyn PlaylistStore) {
        let space = SpaceId::new("g1");
        let other_space = SpaceId::new("g2");
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        let first = store.create(&space, &alice, "Chill").await.unwrap();
        let second = store.create(&space, &alice, "Focus").await.unwrap();
        store.create(&space, &bob, "Bob's").await.unwrap();
        store.create(&other_space, &alice, "Elsewhere").await.unwrap();
        assert!(second.id > first.id);

        let mine = store.list_for_owner(&space, &alice).await.unwrap();
        let names: Vec<_> = mine.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Chill", "Focus"]);

        // Cross-space lookups are not found.
        assert_eq!(
            store.get(&other_space, first.id).await.unwrap_err(),
            PlaylistError::NotFound(first.id)
        );

        store
            .add_track(&space, first.id, Track::new("A", "sa", "pa"))
            .await
            .unwrap();
        let updated = store
            .add_track(&space, first.id, Track::new("B", "sb", "pb"))
            .await
            .unwrap();
        assert_eq!(updated.tracks.len(), 2);

        let removed = store.remove_track(&space, first.id, 0).await.unwrap();
        assert_eq!(removed.map(|t| t.title), Some("A".to_string()));
        assert_eq!(store.remove_track(&space, first.id, 5).await.unwrap(), None);
        assert_eq!(store.get(&space, first.id).await.unwrap().tracks.len(), 1);

        store.delete(&space, first.id).await.unwrap();
        assert_eq!(
            store.get(&space, first.id).await.unwrap_err(),
            PlaylistError::NotFound(first.id)
        );
        assert_eq!(
            store.delete(&space, first.id).await.unwrap_err(),
            PlaylistError::NotFound(first.id)
        );
    }
}
