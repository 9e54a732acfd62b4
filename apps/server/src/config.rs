//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = first free port in 8470-8480).
    /// Override: `CADENZA_BIND_PORT`
    pub bind_port: u16,

    /// Directory for persistent data (playlists).
    /// Override: `CADENZA_DATA_DIR`
    pub data_dir: Option<PathBuf>,

    /// `yt-dlp` executable used to resolve tracks.
    /// Override: `CADENZA_YTDLP_PATH`
    pub ytdlp_path: PathBuf,

    /// Seconds idle with an empty queue before leaving the voice channel.
    /// Override: `CADENZA_IDLE_TIMEOUT`
    pub idle_timeout_secs: u64,

    /// Seconds alone in a voice channel before leaving it.
    /// Override: `CADENZA_ALONE_TIMEOUT`
    pub alone_timeout_secs: u64,

    /// Voice connect attempts before giving up.
    /// Override: `CADENZA_CONNECT_ATTEMPTS`
    pub connect_attempts: u32,

    /// Delay between connect attempts, in milliseconds.
    pub connect_retry_delay_ms: u64,

    /// Pause between connecting and the first track, in milliseconds.
    pub settle_delay_ms: u64,

    /// Maximum pending tracks per guild.
    /// Override: `CADENZA_MAX_QUEUE`
    pub max_queue_len: usize,

    /// Starting volume for new sessions (percent).
    pub default_volume: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = cadenza_core::Config::default();
        Self {
            bind_port: 0,
            data_dir: None,
            ytdlp_path: PathBuf::from("yt-dlp"),
            idle_timeout_secs: core.idle_timeout_secs,
            alone_timeout_secs: core.alone_timeout_secs,
            connect_attempts: core.connect_attempts,
            connect_retry_delay_ms: core.connect_retry_delay_ms,
            settle_delay_ms: core.settle_delay_ms,
            max_queue_len: core.max_queue_len,
            default_volume: core.default_volume,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CADENZA_YTDLP_PATH") {
            if !val.is_empty() {
                self.ytdlp_path = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("CADENZA_IDLE_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                self.idle_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("CADENZA_ALONE_TIMEOUT") {
            if let Ok(secs) = val.parse() {
                self.alone_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("CADENZA_CONNECT_ATTEMPTS") {
            if let Ok(attempts) = val.parse() {
                self.connect_attempts = attempts;
            }
        }

        if let Ok(val) = std::env::var("CADENZA_MAX_QUEUE") {
            if let Ok(len) = val.parse() {
                self.max_queue_len = len;
            }
        }

        // Note: CADENZA_BIND_PORT and CADENZA_DATA_DIR are handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to cadenza-core's Config type.
    pub fn to_core_config(&self) -> cadenza_core::Config {
        cadenza_core::Config {
            preferred_port: self.bind_port,
            idle_timeout_secs: self.idle_timeout_secs,
            alone_timeout_secs: self.alone_timeout_secs,
            connect_attempts: self.connect_attempts,
            connect_retry_delay_ms: self.connect_retry_delay_ms,
            settle_delay_ms: self.settle_delay_ms,
            max_queue_len: self.max_queue_len,
            default_volume: self.default_volume,
            ..Default::default()
        }
    }

    /// Collaborators for the core bootstrap.
    pub fn to_bootstrap_options(&self) -> cadenza_core::BootstrapOptions {
        cadenza_core::BootstrapOptions {
            playlist_dir: self.data_dir.clone(),
            ytdlp_path: self.ytdlp_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_defaults() {
        let core = ServerConfig::default().to_core_config();
        let expected = cadenza_core::Config::default();
        assert_eq!(core.idle_timeout_secs, expected.idle_timeout_secs);
        assert_eq!(core.connect_attempts, expected.connect_attempts);
        assert_eq!(core.preferred_port, 0);
        assert!(core.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config: ServerConfig =
            serde_yaml::from_str("bind_port: 9000\nidle_timeout_secs: 120\n").unwrap();
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.idle_timeout_secs, 120);
        assert_eq!(config.ytdlp_path, PathBuf::from("yt-dlp"));

        let core = config.to_core_config();
        assert_eq!(core.preferred_port, 9000);
        assert_eq!(core.idle_timeout_secs, 120);
    }

    #[test]
    fn data_dir_enables_persistent_playlists() {
        let config: ServerConfig = serde_yaml::from_str("data_dir: /var/lib/cadenza\n").unwrap();
        assert_eq!(
            config.to_bootstrap_options().playlist_dir,
            Some(PathBuf::from("/var/lib/cadenza"))
        );
    }
}
