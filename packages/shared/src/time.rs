use chrono::{DateTime, Utc};

/// Get current Unix timestamp (seconds)
pub fn current_unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Convert a Unix timestamp (seconds) to an RFC 3339 string in UTC.
///
/// Out-of-range values yield an empty string.
pub fn timestamp_to_rfc3339(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
