//! Application services layer.
//!
//! Per-space playback sessions and the command API that routes to them.
//! Infrastructure (voice transport, resolver, playlist storage) is reached
//! only through the capability traits.

pub mod queue;
pub mod session;
pub mod session_manager;
pub(crate) mod session_registry;
pub mod watchdog;

pub use queue::{PlaybackStatus, Queue, QueueSnapshot};
pub use session::{
    EnqueueOutcome, PlaybackSession, SessionDeps, SessionHandle, SessionSnapshot, SessionState,
};
pub use session_manager::SessionManager;
pub use watchdog::{InactivityWatchdog, WatchdogReason};
