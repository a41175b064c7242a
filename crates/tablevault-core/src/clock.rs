//! Timestamp suffixes for snapshot keys and backup locations.

use chrono::{DateTime, Utc};

/// Render a timestamp as the `YYYY-MM-DD-HH-MM-SS` suffix used in snapshot
/// keys and backup directory paths. Lexicographic order on the suffix
/// matches chronological order.
pub fn date_suffix(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d-%H-%M-%S").to_string()
}

pub fn now_suffix() -> String {
    date_suffix(Utc::now())
}
