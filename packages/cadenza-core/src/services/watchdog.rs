//! Cancellable delayed teardown for one session.
//!
//! At most one timer is pending per watchdog: arming always cancels the
//! previous timer first. Every arm gets a fresh id, and the owner must
//! [`claim`](InactivityWatchdog::claim) a fired id before acting on it, so a
//! timer that lost a race with `disarm` is ignored.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::runtime::TaskSpawner;

/// Condition the watchdog was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WatchdogReason {
    /// Nothing playing and nothing pending.
    Idle,
    /// No listeners left in the voice channel.
    Alone,
}

struct ArmedTimer {
    id: u64,
    reason: WatchdogReason,
    duration: Duration,
    token: CancellationToken,
}

/// Single-slot inactivity timer.
pub struct InactivityWatchdog {
    parent: CancellationToken,
    armed: Option<ArmedTimer>,
    next_id: u64,
}

impl InactivityWatchdog {
    /// Creates a disarmed watchdog whose timers also stop when `parent` is cancelled.
    pub fn new(parent: CancellationToken) -> Self {
        Self {
            parent,
            armed: None,
            next_id: 1,
        }
    }

    /// Cancels any pending timer, then schedules `on_fire(arm_id)` after `duration`.
    ///
    /// Returns the arm id passed to `on_fire`.
    pub fn arm<S, F>(
        &mut self,
        spawner: &S,
        duration: Duration,
        reason: WatchdogReason,
        on_fire: F,
    ) -> u64
    where
        S: TaskSpawner,
        F: FnOnce(u64) + Send + 'static,
    {
        self.disarm();

        let id = self.next_id;
        self.next_id += 1;
        let token = self.parent.child_token();

        spawner.spawn_until_cancelled(token.clone(), async move {
            tokio::time::sleep(duration).await;
            on_fire(id);
        });

        log::debug!(
            "[Watchdog] Armed #{} ({:?}) for {:?}",
            id,
            reason,
            duration
        );
        self.armed = Some(ArmedTimer {
            id,
            reason,
            duration,
            token,
        });
        id
    }

    /// Cancels the pending timer, if any, returning its reason.
    pub fn disarm(&mut self) -> Option<WatchdogReason> {
        let timer = self.armed.take()?;
        timer.token.cancel();
        log::debug!("[Watchdog] Disarmed #{} ({:?})", timer.id, timer.reason);
        Some(timer.reason)
    }

    /// Consumes a fired timer.
    ///
    /// Returns its reason only if `arm_id` is still the armed timer.
    pub fn claim(&mut self, arm_id: u64) -> Option<WatchdogReason> {
        match &self.armed {
            Some(timer) if timer.id == arm_id => self.armed.take().map(|t| t.reason),
            _ => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn reason(&self) -> Option<WatchdogReason> {
        self.armed.as_ref().map(|t| t.reason)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.armed.as_ref().map(|t| t.duration)
    }
}

impl Drop for InactivityWatchdog {
    fn drop(&mut self) {
        if let Some(timer) = self.armed.take() {
            timer.token.cancel();
        }
    }
}
