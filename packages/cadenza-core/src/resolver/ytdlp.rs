//! `yt-dlp` backed resolver.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use super::{ResolveError, ResolveResult, TrackResolver};
use crate::types::Track;

/// Title used when the extractor reports none.
const UNKNOWN_TITLE: &str = "Unknown";

/// Resolves tracks by shelling out to `yt-dlp --dump-json`.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: PathBuf,
    timeout: Duration,
}

impl YtDlpResolver {
    /// Creates a resolver that runs `program` with a per-query `timeout`.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    async fn extract(&self, target: &str) -> ResolveResult<Track> {
        log::debug!("[Resolver] Extracting {}", target);

        let mut command = Command::new(&self.program);
        command
            .args(["--dump-json", "--no-playlist", "--no-warnings"])
            .args(["--format", "bestaudio/best"])
            .arg(target)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ResolveError::Timeout(self.timeout))?
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => ResolveError::Unavailable(
                    format!("{}: {}", self.program.display(), e),
                ),
                _ => ResolveError::Failed(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("extractor exited with an error")
                .trim()
                .to_string();
            log::warn!("[Resolver] yt-dlp failed for {}: {}", target, reason);
            return Err(ResolveError::Failed(reason));
        }

        parse_track(&output.stdout)
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve_url(&self, url: &str) -> ResolveResult<Track> {
        self.extract(url).await
    }

    async fn resolve_search(&self, query: &str) -> ResolveResult<Track> {
        self.extract(&format!("ytsearch:{query}")).await
    }
}

/// Subset of the `--dump-json` document we care about.
#[derive(Debug, Deserialize)]
struct ExtractedInfo {
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
}

/// Parses the first JSON document printed by `yt-dlp --dump-json`.
fn parse_track(stdout: &[u8]) -> ResolveResult<Track> {
    let text = String::from_utf8_lossy(stdout);
    let first = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or(ResolveError::Incomplete)?;

    let info: ExtractedInfo =
        serde_json::from_str(first).map_err(|e| ResolveError::Parse(e.to_string()))?;

    let title = info.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let stream = info.url.unwrap_or_default();
    if stream.is_empty() || title.trim().is_empty() {
        return Err(ResolveError::Incomplete);
    }

    let mut track = Track::new(title, stream, info.webpage_url.unwrap_or_default());
    if let Some(secs) = info.duration.filter(|d| d.is_finite() && *d >= 0.0) {
        track = track.with_duration(secs as u64);
    }
    Ok(track)
}
