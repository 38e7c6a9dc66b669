/// Staleness detection for aggregated readings.
///
/// Barangay sensors report every few minutes under normal conditions. During
/// a typhoon, a silent sensor is dangerous: the dashboard keeps showing the
/// last level it saw. This module flags reports whose most recent usable
/// reading is too old.
///
/// # Clock injection
/// Every function takes `now: DateTime<Utc>` explicitly.

use chrono::{DateTime, Duration, Utc};

use crate::model::Statistics;

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Returns `true` if the latest reading in `stats` is older than `max_age`
/// relative to `now`.
///
/// Staleness is defined as strictly greater than the threshold:
///   age > max_age  →  stale
///   age == max_age →  not stale
///
/// Statistics without data are always stale.
///
/// # Typical thresholds
/// - Normal monitoring: 60 minutes
/// - Active typhoon signal: 15 minutes
pub fn is_stale_at(stats: &Statistics, max_age: Duration, now: DateTime<Utc>) -> bool {
    match stats.latest_at {
        Some(latest_at) => now - latest_at > max_age,
        None => true,
    }
}

/// Age of the latest reading, if any.
pub fn age_at(stats: &Statistics, now: DateTime<Utc>) -> Option<Duration> {
    stats.latest_at.map(|t| now - t)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
