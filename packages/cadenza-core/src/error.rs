//! Centralized error types for the Cadenza core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::playlist::{PlaylistError, PlaylistId};
use crate::resolver::ResolveError;
use crate::transport::TransportError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "transport_timeout",
            Self::PermissionDenied(_) => "transport_permission_denied",
            Self::ChannelNotFound(_) => "channel_not_found",
            Self::Handshake(_) => "transport_handshake_failed",
            Self::NotConnected => "transport_not_connected",
            Self::Playback(_) => "transport_playback_failed",
        }
    }
}

impl ErrorCode for ResolveError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "resolver_unavailable",
            Self::Failed(_) => "resolve_failed",
            Self::Parse(_) => "resolve_parse_error",
            Self::Incomplete => "resolve_incomplete",
            Self::Timeout(_) => "resolve_timeout",
        }
    }
}

impl ErrorCode for PlaylistError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "playlist_not_found",
            Self::Io(_) => "playlist_io_error",
            Self::Corrupt(_) => "playlist_store_corrupt",
        }
    }
}

/// Error returned by the playback command API.
///
/// Resolution and connection failures are recovered locally (the session goes
/// back to Idle) and surfaced to the immediate caller through this type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// Caller is not in a voice channel the bot could join.
    #[error("You need to be in a voice channel to use this command")]
    NotInChannel,

    /// Transport connect exhausted its retry policy.
    #[error("Failed to connect to voice channel after {attempts} attempt(s): {reason}")]
    ConnectFailed { attempts: u32, reason: String },

    /// Track metadata lookup failed.
    #[error("Could not find or load the requested song: {0}")]
    ResolveFailed(String),

    /// Caller lacks the permission required for the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Nothing is currently playing.
    #[error("Nothing is currently playing")]
    NothingPlaying,

    /// Nothing is currently paused.
    #[error("Nothing is currently paused")]
    NothingPaused,

    /// Queue is at its configured capacity.
    #[error("Queue is full ({0} tracks)")]
    QueueFull(usize),

    /// Request was accepted but a stop cancelled it before playback started.
    #[error("Playback request cancelled by stop")]
    Cancelled,

    /// Transport refused to start the requested track.
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Playlist does not exist in this collaboration space.
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(PlaylistId),

    /// Playlist storage failed.
    #[error("Playlist storage error: {0}")]
    Storage(String),

    /// The session for this collaboration space is shutting down.
    #[error("Session unavailable")]
    SessionUnavailable,
}

impl PlaybackError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInChannel => "not_in_channel",
            Self::ConnectFailed { .. } => "connect_failed",
            Self::ResolveFailed(_) => "resolve_failed",
            Self::PermissionDenied(_) => "permission_denied",
            Self::NothingPlaying => "nothing_playing",
            Self::NothingPaused => "nothing_paused",
            Self::QueueFull(_) => "queue_full",
            Self::Cancelled => "cancelled",
            Self::PlaybackFailed(_) => "playback_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::PlaylistNotFound(_) => "playlist_not_found",
            Self::Storage(_) => "storage_error",
            Self::SessionUnavailable => "session_unavailable",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotInChannel | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::PlaylistNotFound(_) => StatusCode::NOT_FOUND,
            Self::NothingPlaying | Self::NothingPaused | Self::QueueFull(_) | Self::Cancelled => {
                StatusCode::CONFLICT
            }
            Self::ResolveFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ConnectFailed { .. } | Self::PlaybackFailed(_) => StatusCode::BAD_GATEWAY,
            Self::SessionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> &'static str {
        PlaybackError::code(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::playlist::PlaylistResult;
pub use crate::resolver::ResolveResult;
pub use crate::transport::TransportResult;

/// Convenient Result alias for command API operations.
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for PlaybackError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ResolveError> for PlaybackError {
    fn from(err: ResolveError) -> Self {
        Self::ResolveFailed(err.to_string())
    }
}

impl From<PlaylistError> for PlaybackError {
    fn from(err: PlaylistError) -> Self {
        match err {
            PlaylistError::NotFound(id) => Self::PlaylistNotFound(id),
            other => Self::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_in_channel_is_bad_request() {
        let err = PlaybackError::NotInChannel;
        assert_eq!(err.code(), "not_in_channel");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn connect_failed_reports_attempts() {
        let err = PlaybackError::ConnectFailed {
            attempts: 2,
            reason: "handshake failed: timeout".into(),
        };
        assert_eq!(err.code(), "connect_failed");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("2 attempt(s)"));
    }

    #[test]
    fn playlist_not_found_maps_from_store_error() {
        let err: PlaybackError = PlaylistError::NotFound(PlaylistId(7)).into();
        assert_eq!(err, PlaybackError::PlaylistNotFound(PlaylistId(7)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn resolve_error_maps_to_resolve_failed() {
        let err: PlaybackError = ResolveError::Incomplete.into();
        assert_eq!(err.code(), "resolve_failed");
    }

    #[test]
    fn transport_errors_have_codes() {
        assert_eq!(TransportError::NotConnected.code(), "transport_not_connected");
        assert_eq!(
            TransportError::PermissionDenied("speak".into()).code(),
            "transport_permission_denied"
        );
    }
}
