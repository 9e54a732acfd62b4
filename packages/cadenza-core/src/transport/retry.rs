//! Bounded connect retry with cleanup between attempts.

use std::time::Duration;

use super::{TransportError, TransportEventSink, VoiceConnection, VoiceTransport};
use crate::error::PlaybackError;
use crate::state::Config;
use crate::types::{ChannelId, SpaceId};

/// Retry policy for establishing a voice connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
    /// Deadline for a single attempt.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.connect_attempts.max(1),
            delay: config.connect_retry_delay(),
            attempt_timeout: config.connect_timeout(),
        }
    }
}

/// Connect exhausted its policy or hit a non-retryable error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectFailure {
    /// Attempts actually made.
    pub attempts: u32,
    pub last_error: TransportError,
}

impl From<ConnectFailure> for PlaybackError {
    fn from(failure: ConnectFailure) -> Self {
        match failure.last_error {
            TransportError::PermissionDenied(what) => PlaybackError::PermissionDenied(what),
            other => PlaybackError::ConnectFailed {
                attempts: failure.attempts,
                reason: other.to_string(),
            },
        }
    }
}

/// Connects with bounded retries.
///
/// Before every attempt, any resource the transport still holds for `space`
/// is released through [`VoiceTransport::cleanup_partial`] and reported via
/// `on_orphan`; callers only invoke this while the session holds no
/// connection, so such a resource is always stale. After a failed attempt the
/// half-established resource is released before the next one starts.
/// Non-transient errors fail fast.
pub async fn connect_with_retry(
    transport: &dyn VoiceTransport,
    space: &SpaceId,
    channel: &ChannelId,
    policy: RetryPolicy,
    events: TransportEventSink,
    on_orphan: &(dyn Fn() + Send + Sync),
) -> Result<Box<dyn VoiceConnection>, ConnectFailure> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        if transport.has_resource(space) {
            log::warn!(
                "[Transport] Releasing orphaned voice resource for space {} before connecting",
                space
            );
            transport.cleanup_partial(space).await;
            on_orphan();
        }

        let result = tokio::time::timeout(
            policy.attempt_timeout,
            transport.connect(space, channel, policy.attempt_timeout, events.clone()),
        )
        .await
        .unwrap_or(Err(TransportError::Timeout(policy.attempt_timeout)));

        let error = match result {
            Ok(connection) => {
                if attempt > 1 {
                    log::info!(
                        "[Transport] Connected to {} in space {} on attempt {}/{}",
                        channel,
                        space,
                        attempt,
                        max_attempts
                    );
                }
                return Ok(connection);
            }
            Err(e) => e,
        };

        log::warn!(
            "[Transport] Connect attempt {}/{} for space {} failed: {}",
            attempt,
            max_attempts,
            space,
            error
        );
        transport.cleanup_partial(space).await;

        if !error.is_transient() || attempt >= max_attempts {
            return Err(ConnectFailure {
                attempts: attempt,
                last_error: error,
            });
        }

        log::info!(
            "[Transport] Retrying connect for space {} in {:?}",
            space,
            policy.delay
        );
        tokio::time::sleep(policy.delay).await;
    }
}
