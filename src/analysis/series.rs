/// Fixed-width time buckets for dashboard charts.
///
/// The chart layer wants one point per hour (or per day) rather than raw
/// readings, so the window is cut into consecutive half-open buckets and
/// each bucket is aggregated on its own.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::analysis::aggregate::{aggregate_with, AggregationPolicy};
use crate::model::{AnalysisError, Sample, Statistics, Window};

/// Upper limit on bucket count per request.
pub const MAX_BUCKETS: i64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub stats: Statistics,
}

/// Splits `window` into buckets of `width` and aggregates each.
///
/// The last bucket is clipped at `window.end`. Samples are sorted once so
/// each bucket only scans its own slice.
pub fn bucketize(
    samples: &[Sample],
    window: &Window,
    width: Duration,
    policy: &AggregationPolicy,
) -> Result<Vec<Bucket>, AnalysisError> {
    if window.start >= window.end {
        return Err(AnalysisError::InvalidWindowSpec(format!(
            "start {} is not before end {}",
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        )));
    }
    if width < Duration::milliseconds(1) {
        return Err(AnalysisError::InvalidWindowSpec(format!(
            "bucket width must be at least 1ms, got {}ms",
            width.num_milliseconds()
        )));
    }
    let span_ms = window.duration().num_milliseconds();
    let width_ms = width.num_milliseconds();
    let n_buckets = span_ms / width_ms + i64::from(span_ms % width_ms != 0);
    if n_buckets > MAX_BUCKETS {
        return Err(AnalysisError::InvalidWindowSpec(format!(
            "{} buckets requested, limit is {}",
            n_buckets, MAX_BUCKETS
        )));
    }

    let mut sorted: Vec<&Sample> = samples.iter().filter(|s| window.contains(s.timestamp)).collect();
    sorted.sort_by_key(|s| s.timestamp);

    let mut buckets = Vec::with_capacity(n_buckets as usize);
    let mut cursor = 0;
    let mut start = window.start;
    while start < window.end {
        let end = start
            .checked_add_signed(width)
            .map_or(window.end, |e| e.min(window.end));
        let bucket_window = Window { start, end };
        let len = sorted[cursor..].partition_point(|s| s.timestamp < end);
        let stats = aggregate_with(sorted[cursor..cursor + len].iter().copied(), &bucket_window, policy);
        cursor += len;
        buckets.push(Bucket { start, end, stats });
        start = end;
    }
    Ok(buckets)
}
