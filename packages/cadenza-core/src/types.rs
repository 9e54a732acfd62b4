//! Identifier newtypes and the [`Track`] value.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifies a collaboration space (a guild / server).
    ///
    /// Exactly one playback session and one queue exist per space.
    SpaceId
);

string_id!(
    /// Identifies a voice channel inside a collaboration space.
    ChannelId
);

string_id!(
    /// Identifies a user (command caller, track requester, playlist owner).
    UserId
);

/// One playable, resolved item.
///
/// Created by a [`TrackResolver`](crate::resolver::TrackResolver) or loaded
/// from a playlist; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Display title.
    pub title: String,
    /// Opaque, possibly short-lived locator the transport renders from.
    pub stream_locator: String,
    /// Canonical page locator (shareable link).
    pub page_locator: String,
    /// Duration in seconds, when the resolver knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    /// Who asked for this track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<UserId>,
}

impl Track {
    /// Creates a track without duration or requester.
    pub fn new(
        title: impl Into<String>,
        stream_locator: impl Into<String>,
        page_locator: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            stream_locator: stream_locator.into(),
            page_locator: page_locator.into(),
            duration_secs: None,
            requester: None,
        }
    }

    /// Returns a copy of this track with the duration set.
    #[must_use]
    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Returns a copy of this track attributed to `requester`.
    #[must_use]
    pub fn requested_by(mut self, requester: UserId) -> Self {
        self.requester = Some(requester);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let space = SpaceId::new("123456789");
        assert_eq!(serde_json::to_string(&space).unwrap(), "\"123456789\"");
        assert_eq!(space.to_string(), "123456789");
    }

    #[test]
    fn track_serializes_camel_case_and_skips_missing_fields() {
        let track = Track::new("Song", "https://cdn/a", "https://page/a");
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["streamLocator"], "https://cdn/a");
        assert_eq!(json["pageLocator"], "https://page/a");
        assert!(json.get("durationSecs").is_none());
        assert!(json.get("requester").is_none());
    }

    #[test]
    fn tracks_compare_structurally() {
        let a = Track::new("Song", "s", "p").with_duration(200);
        let b = Track::new("Song", "s", "p").with_duration(200);
        assert_eq!(a, b);
        assert_ne!(a, b.requested_by(UserId::new("u1")));
    }
}
