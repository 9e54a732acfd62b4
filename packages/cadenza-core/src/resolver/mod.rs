//! Track metadata resolution.
//!
//! Turns a URL or a free-text search into a playable [`Track`]. The playback
//! core only consumes the [`TrackResolver`] trait; [`YtDlpResolver`] is the
//! production implementation.

mod ytdlp;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use ytdlp::YtDlpResolver;

use crate::types::Track;
use crate::utils::is_url_query;

/// Errors produced while resolving a track.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The extractor binary is missing or cannot be executed.
    #[error("Resolver unavailable: {0}")]
    Unavailable(String),

    /// The extractor ran but could not resolve the query.
    #[error("Extraction failed: {0}")]
    Failed(String),

    /// Extractor output was not valid metadata.
    #[error("Failed to parse track info: {0}")]
    Parse(String),

    /// Metadata lacked a stream locator or a title.
    #[error("Incomplete track information")]
    Incomplete,

    /// Resolution did not finish in time.
    #[error("Resolution timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Resolves queries into tracks.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolves a direct URL.
    async fn resolve_url(&self, url: &str) -> ResolveResult<Track>;

    /// Resolves a free-text search, returning the first hit.
    async fn resolve_search(&self, query: &str) -> ResolveResult<Track>;
}

/// Resolves `query` by URL when it looks like one, by search otherwise.
pub async fn resolve_query(resolver: &dyn TrackResolver, query: &str) -> ResolveResult<Track> {
    let query = query.trim();
    if is_url_query(query) {
        resolver.resolve_url(query).await
    } else {
        resolver.resolve_search(query).await
    }
}
