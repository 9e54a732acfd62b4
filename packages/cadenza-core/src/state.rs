//! Core configuration types.
//!
//! [`Config`] carries every tunable the playback core consumes. It is injected
//! at construction time; nothing in the session machinery hardcodes these
//! values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the Cadenza playback core.
///
/// All fields have defaults suitable for a small community deployment.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP control server (0 = auto-allocate).
    pub preferred_port: u16,

    // Session lifecycle
    /// Idle time with nothing playing and an empty queue before disconnecting (seconds).
    pub idle_timeout_secs: u64,

    /// Time the bot may sit alone in a voice channel before disconnecting (seconds).
    pub alone_timeout_secs: u64,

    // Transport
    /// Number of connect attempts before reporting `ConnectFailed`.
    pub connect_attempts: u32,

    /// Fixed delay between connect attempts (milliseconds).
    pub connect_retry_delay_ms: u64,

    /// Per-attempt connect timeout (milliseconds).
    pub connect_timeout_ms: u64,

    /// Delay between a completed connect and the first play call (milliseconds).
    pub settle_delay_ms: u64,

    // Queue
    /// Maximum number of pending tracks per collaboration space.
    pub max_queue_len: usize,

    /// Volume applied to new sessions (percent, 0-100).
    pub default_volume: u8,

    // Resolver
    /// Timeout for a single track resolution (milliseconds).
    pub resolve_timeout_ms: u64,

    // Playlists
    /// Maximum playlist name length (characters).
    pub max_playlist_name_len: usize,

    // Events
    /// Capacity of the session event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_attempts == 0 {
            return Err("connect_attempts must be >= 1".to_string());
        }
        if self.max_queue_len == 0 {
            return Err("max_queue_len must be >= 1".to_string());
        }
        if self.default_volume > 100 {
            return Err("default_volume must be within 0-100".to_string());
        }
        if self.max_playlist_name_len == 0 {
            return Err("max_playlist_name_len must be >= 1".to_string());
        }
        if self.event_channel_capacity == 0 {
            return Err(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".to_string(),
            );
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn alone_timeout(&self) -> Duration {
        Duration::from_secs(self.alone_timeout_secs)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            idle_timeout_secs: 300,
            alone_timeout_secs: 60,
            connect_attempts: 2,
            connect_retry_delay_ms: 1000,
            connect_timeout_ms: 10_000,
            settle_delay_ms: 500,
            max_queue_len: 100,
            default_volume: 50,
            resolve_timeout_ms: 30_000,
            max_playlist_name_len: 50,
            event_channel_capacity: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn config_defaults_are_five_minutes_idle_and_two_attempts() {
        let config = Config::default();
        assert_eq!(config.idle_timeout(), Duration::from_secs(300));
        assert_eq!(config.connect_attempts, 2);
        assert_eq!(config.max_queue_len, 100);
        assert_eq!(config.default_volume, 50);
    }

    #[test]
    fn config_rejects_degenerate_values() {
        let mut config = Config::default();
        config.connect_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_queue_len = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.default_volume = 101;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.event_channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"idle_timeout_secs": 10}"#).unwrap();
        assert_eq!(config.idle_timeout_secs, 10);
        assert_eq!(config.connect_attempts, 2);
    }
}
