//! Playlist store persisted as a single JSON document.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{Playlist, PlaylistError, PlaylistId, PlaylistResult, PlaylistStore};
use crate::types::{SpaceId, Track, UserId};
use crate::utils::now_millis;

const PLAYLISTS_FILE: &str = "playlists.json";
const PLAYLISTS_TEMP_FILE: &str = "playlists.json.tmp";

/// Serializes every playlist file write in the process.
static STORE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn store_lock() -> &'static Mutex<()> {
    STORE_LOCK.get_or_init(|| Mutex::new(()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistDocument {
    next_id: u64,
    playlists: Vec<Playlist>,
}

impl Default for PlaylistDocument {
    fn default() -> Self {
        Self {
            next_id: 1,
            playlists: Vec::new(),
        }
    }
}

impl PlaylistDocument {
    fn find_mut(&mut self, space: &SpaceId, id: PlaylistId) -> PlaylistResult<&mut Playlist> {
        self.playlists
            .iter_mut()
            .find(|p| p.id == id && &p.space == space)
            .ok_or(PlaylistError::NotFound(id))
    }
}

/// Playlist store backed by `playlists.json` in a data directory.
///
/// The whole document is kept in memory and rewritten on every mutation via
/// temp file + rename, so a crash never leaves a half-written file.
pub struct JsonFilePlaylistStore {
    dir: PathBuf,
    document: Mutex<PlaylistDocument>,
}

impl JsonFilePlaylistStore {
    /// Opens (or starts) the store in `dir`.
    ///
    /// A missing file is an empty store. An unreadable document is an error
    /// rather than being silently replaced.
    pub fn open(dir: impl Into<PathBuf>) -> PlaylistResult<Self> {
        let dir = dir.into();
        let path = dir.join(PLAYLISTS_FILE);
        let document = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| PlaylistError::Corrupt(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PlaylistDocument::default(),
            Err(e) => return Err(e.into()),
        };

        log::info!(
            "[Playlist] Loaded {} playlist(s) from {}",
            document.playlists.len(),
            path.display()
        );
        Ok(Self {
            dir,
            document: Mutex::new(document),
        })
    }

    /// Directory the store writes to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn save(&self, document: &PlaylistDocument) -> PlaylistResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(PLAYLISTS_FILE);
        let temp_path = self.dir.join(PLAYLISTS_TEMP_FILE);
        let contents = serde_json::to_string_pretty(document)
            .map_err(|e| PlaylistError::Io(e.to_string()))?;

        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    /// Applies `change` to a copy of the document and commits it once saved.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut PlaylistDocument) -> PlaylistResult<T>,
    ) -> PlaylistResult<T> {
        let _guard = store_lock().lock();
        let mut document = self.document.lock();
        let mut next = document.clone();
        let out = change(&mut next)?;
        if let Err(e) = self.save(&next) {
            log::error!("[Playlist] Failed to persist playlists: {}", e);
            return Err(e);
        }
        *document = next;
        Ok(out)
    }
}

#[async_trait]
impl PlaylistStore for JsonFilePlaylistStore {
    async fn create(
        &self,
        space: &SpaceId,
        owner: &UserId,
        name: &str,
    ) -> PlaylistResult<Playlist> {
        self.mutate(|doc| {
            let playlist = Playlist {
                id: PlaylistId(doc.next_id),
                space: space.clone(),
                owner: owner.clone(),
                name: name.to_string(),
                tracks: Vec::new(),
                created_at: now_millis(),
            };
            doc.next_id += 1;
            doc.playlists.push(playlist.clone());
            Ok(playlist)
        })
    }

    async fn get(&self, space: &SpaceId, id: PlaylistId) -> PlaylistResult<Playlist> {
        self.document
            .lock()
            .playlists
            .iter()
            .find(|p| p.id == id && &p.space == space)
            .cloned()
            .ok_or(PlaylistError::NotFound(id))
    }

    async fn list_for_owner(
        &self,
        space: &SpaceId,
        owner: &UserId,
    ) -> PlaylistResult<Vec<Playlist>> {
        Ok(self
            .document
            .lock()
            .playlists
            .iter()
            .filter(|p| &p.space == space && &p.owner == owner)
            .cloned()
            .collect())
    }

    async fn add_track(
        &self,
        space: &SpaceId,
        id: PlaylistId,
        track: Track,
    ) -> PlaylistResult<Playlist> {
        self.mutate(|doc| {
            let playlist = doc.find_mut(space, id)?;
            playlist.tracks.push(track);
            Ok(playlist.clone())
        })
    }

    async fn remove_track(
        &self,
        space: &SpaceId,
        id: PlaylistId,
        index: usize,
    ) -> PlaylistResult<Option<Track>> {
        // Out-of-range indices skip the disk write entirely.
        {
            let document = self.document.lock();
            let playlist = document
                .playlists
                .iter()
                .find(|p| p.id == id && &p.space == space)
                .ok_or(PlaylistError::NotFound(id))?;
            if index >= playlist.tracks.len() {
                return Ok(None);
            }
        }
        self.mutate(|doc| {
            let playlist = doc.find_mut(space, id)?;
            if index >= playlist.tracks.len() {
                return Ok(None);
            }
            Ok(Some(playlist.tracks.remove(index)))
        })
    }

    async fn delete(&self, space: &SpaceId, id: PlaylistId) -> PlaylistResult<()> {
        self.mutate(|doc| {
            let before = doc.playlists.len();
            doc.playlists.retain(|p| !(p.id == id && &p.space == space));
            if doc.playlists.len() == before {
                return Err(PlaylistError::NotFound(id));
            }
            Ok(())
        })
    }
}
