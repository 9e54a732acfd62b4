//! Per-space track queue.
//!
//! Mutated only by the owning session actor, so it carries no locking of its
//! own.

use std::collections::VecDeque;

use serde::Serialize;

use crate::types::Track;

/// Rendering status of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Read-only view of a queue for display.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub current: Option<Track>,
    pub pending: Vec<Track>,
    pub status: PlaybackStatus,
}

/// FIFO of pending tracks plus the "currently playing" slot.
///
/// `current` is `Some` exactly when `status` is `Playing` or `Paused`.
#[derive(Debug, Default)]
pub struct Queue {
    pending: VecDeque<Track>,
    current: Option<Track>,
    status: PlaybackStatus,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the back of `pending`.
    pub fn enqueue(&mut self, track: Track) {
        self.pending.push_back(track);
    }

    /// Removes and returns the head of `pending`. Does not touch `current`.
    pub fn take_next(&mut self) -> Option<Track> {
        self.pending.pop_front()
    }

    /// Empties `pending`, clears `current` and returns to Idle.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
        self.status = PlaybackStatus::Idle;
    }

    /// Marks `track` as rendering.
    pub fn start(&mut self, track: Track) {
        self.current = Some(track);
        self.status = PlaybackStatus::Playing;
    }

    /// Clears `current` and returns to Idle, keeping `pending`.
    ///
    /// Returns the track that was current.
    pub fn finish_current(&mut self) -> Option<Track> {
        self.status = PlaybackStatus::Idle;
        self.current.take()
    }

    /// Playing → Paused. Returns false in any other status.
    pub fn pause(&mut self) -> bool {
        if self.status != PlaybackStatus::Playing {
            return false;
        }
        self.status = PlaybackStatus::Paused;
        true
    }

    /// Paused → Playing. Returns false in any other status.
    pub fn resume(&mut self) -> bool {
        if self.status != PlaybackStatus::Paused {
            return false;
        }
        self.status = PlaybackStatus::Playing;
        true
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// True when nothing is current and nothing is pending.
    pub fn is_drained(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            current: self.current.clone(),
            pending: self.pending.iter().cloned().collect(),
            status: self.status,
        }
    }

    /// Checks the `current`/`status` pairing.
    pub fn is_consistent(&self) -> bool {
        self.current.is_some() == (self.status != PlaybackStatus::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track::new(title, format!("s/{title}"), format!("p/{title}"))
    }

    #[test]
    fn pending_preserves_insertion_order() {
        let mut queue = Queue::new();
        let titles: Vec<String> = (0..25).map(|i| format!("t{i}")).collect();
        for title in &titles {
            queue.enqueue(track(title));
        }

        let snapshot: Vec<String> = queue
            .snapshot()
            .pending
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(snapshot, titles);

        let mut drained = Vec::new();
        while let Some(t) = queue.take_next() {
            drained.push(t.title);
        }
        assert_eq!(drained, titles);
    }

    #[test]
    fn take_next_leaves_current_alone() {
        let mut queue = Queue::new();
        queue.start(track("a"));
        queue.enqueue(track("b"));

        assert_eq!(queue.take_next().map(|t| t.title), Some("b".into()));
        assert_eq!(queue.current().map(|t| t.title.as_str()), Some("a"));
        assert!(queue.take_next().is_none());
    }

    #[test]
    fn status_transitions_keep_invariant() {
        let mut queue = Queue::new();
        assert!(queue.is_consistent());

        queue.start(track("a"));
        assert_eq!(queue.status(), PlaybackStatus::Playing);
        assert!(queue.is_consistent());

        assert!(queue.pause());
        assert!(!queue.pause());
        assert_eq!(queue.status(), PlaybackStatus::Paused);
        assert!(queue.is_consistent());

        assert!(queue.resume());
        assert!(!queue.resume());
        assert!(queue.is_consistent());

        queue.finish_current();
        assert_eq!(queue.status(), PlaybackStatus::Idle);
        assert!(queue.is_consistent());
    }

    #[test]
    fn clear_resets_everything() {
        let mut queue = Queue::new();
        queue.start(track("a"));
        queue.enqueue(track("b"));
        queue.pause();

        queue.clear();
        assert!(queue.is_drained());
        assert_eq!(queue.status(), PlaybackStatus::Idle);
        assert_eq!(queue.snapshot(), QueueSnapshot::default());
    }

    #[test]
    fn snapshot_is_detached_copy() {
        let mut queue = Queue::new();
        queue.enqueue(track("a"));
        let mut snapshot = queue.snapshot();
        snapshot.pending.clear();
        assert_eq!(queue.pending_len(), 1);
    }
}
