//! General utilities shared across the application.

use std::time::{SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Query Classification
// ─────────────────────────────────────────────────────────────────────────────

/// Returns true if a play query should be resolved as a direct URL.
///
/// Anything else is treated as a free-text search.
#[must_use]
pub fn is_url_query(query: &str) -> bool {
    let query = query.trim_start();
    query.starts_with("http://") || query.starts_with("https://")
}

/// Shortens a (possibly very long, signed) stream locator for log output.
#[must_use]
pub fn preview_locator(locator: &str) -> String {
    const MAX_PREVIEW: usize = 50;
    match locator.char_indices().nth(MAX_PREVIEW) {
        Some((idx, _)) => format!("{}...", &locator[..idx]),
        None => locator.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_queries_are_detected() {
        assert!(is_url_query("https://www.youtube.com/watch?v=abc"));
        assert!(is_url_query("  http://example.com/a.mp3"));
        assert!(!is_url_query("never gonna give you up"));
        assert!(!is_url_query("ftp://example.com/a.mp3"));
    }

    #[test]
    fn preview_truncates_long_locators() {
        let long = "x".repeat(80);
        let preview = preview_locator(&long);
        assert_eq!(preview.len(), 53);
        assert!(preview.ends_with("..."));
        assert_eq!(preview_locator("short"), "short");
    }

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
