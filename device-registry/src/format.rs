//! Human-readable labels for device state.

use chrono::{DateTime, Utc};

/// Relative "last seen" label: `Just now`, `5m ago`, `3h ago`.
///
/// Timestamps in the future count as just now.
pub fn format_last_seen(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - last_seen).num_seconds().max(0);

    if elapsed < 60 {
        "Just now".to_string()
    } else if elapsed < 3600 {
        format!("{}m ago", elapsed / 60)
    } else {
        format!("{}h ago", elapsed / 3600)
    }
}
