//! Space → session handle registry.
//!
//! Sessions are created lazily on the first play in a space and live until
//! the space is removed or the process shuts down.

use dashmap::DashMap;

use super::session::{PlaybackSession, SessionDeps, SessionHandle};
use crate::types::SpaceId;

/// Concurrent map from space to its session actor.
pub(crate) struct SessionRegistry {
    sessions: DashMap<SpaceId, SessionHandle>,
    deps: SessionDeps,
}

impl SessionRegistry {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            sessions: DashMap::new(),
            deps,
        }
    }

    /// Returns the live session for `space`, spawning one if none exists.
    ///
    /// A handle whose actor has exited is replaced, so at most one live
    /// session exists per space.
    pub fn get_or_create(&self, space: &SpaceId) -> SessionHandle {
        let mut entry = self
            .sessions
            .entry(space.clone())
            .or_insert_with(|| PlaybackSession::spawn(space.clone(), self.deps.clone()));
        if entry.is_closed() {
            log::debug!("[Registry] Replacing exited session for space {}", space);
            *entry = PlaybackSession::spawn(space.clone(), self.deps.clone());
        }
        entry.value().clone()
    }

    /// Returns the live session for `space` without creating one.
    pub fn get(&self, space: &SpaceId) -> Option<SessionHandle> {
        self.sessions
            .get(space)
            .filter(|h| !h.is_closed())
            .map(|h| h.value().clone())
    }

    pub fn remove(&self, space: &SpaceId) -> Option<SessionHandle> {
        self.sessions.remove(space).map(|(_, h)| h)
    }

    pub fn contains(&self, space: &SpaceId) -> bool {
        self.sessions.contains_key(space)
    }

    pub fn spaces(&self) -> Vec<SpaceId> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    /// Removes and returns every handle.
    pub fn drain(&self) -> Vec<SessionHandle> {
        let spaces = self.spaces();
        spaces.iter().filter_map(|s| self.remove(s)).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn deps(&self) -> &SessionDeps {
        &self.deps
    }
}
