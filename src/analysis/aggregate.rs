//! Windowed reduction of readings into `Statistics`.
//!
//! Input does not need to be sorted or pre-filtered: every sample is checked
//! against the window and its quality flag in a single pass. `latest` is the
//! value with the greatest timestamp, not the last one in input order.

use chrono::{DateTime, Utc};

use crate::model::{Quality, Sample, Statistics, Window};

/// Which quality flags count toward the numeric statistics.
///
/// `Quality::Ok` always counts. Missing and error samples never do; they
/// only show up in `Statistics::observed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationPolicy {
    pub include_estimated: bool,
}

impl AggregationPolicy {
    pub fn counts(&self, quality: Quality) -> bool {
        match quality {
            Quality::Ok => true,
            Quality::Estimated => self.include_estimated,
            Quality::Missing | Quality::Error => false,
        }
    }
}

/// Running state of a single aggregation pass.
///
/// Feed samples with `push` in any order, then call `finish`.
#[derive(Debug, Clone)]
pub struct Accumulator {
    window: Window,
    policy: AggregationPolicy,
    observed: usize,
    count: usize,
    min: f64,
    max: f64,
    sum: f64,
    latest: Option<(DateTime<Utc>, f64)>,
}

impl Accumulator {
    pub fn new(window: Window, policy: AggregationPolicy) -> Self {
        Accumulator {
            window,
            policy,
            observed: 0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            latest: None,
        }
    }

    pub fn push(&mut self, sample: &Sample) {
        if !self.window.contains(sample.timestamp) {
            return;
        }
        self.observed += 1;

        if !self.policy.counts(sample.quality) {
            return;
        }
        // Non-finite values are treated as missing.
        let value = match sample.value {
            Some(v) if v.is_finite() => v,
            _ => return,
        };

        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;

        // Ties go to the later sample in input order.
        match self.latest {
            Some((t, _)) if sample.timestamp < t => {}
            _ => self.latest = Some((sample.timestamp, value)),
        }
    }

    pub fn finish(self) -> Statistics {
        if self.count == 0 {
            return Statistics {
                observed: self.observed,
                ..Statistics::empty()
            };
        }
        Statistics {
            count: self.count,
            observed: self.observed,
            min: Some(self.min),
            max: Some(self.max),
            mean: Some(self.sum / self.count as f64),
            sum: Some(self.sum),
            latest: self.latest.map(|(_, v)| v),
            latest_at: self.latest.map(|(t, _)| t),
        }
    }
}

/// Aggregates `samples` over `window`, counting only `Quality::Ok` readings.
pub fn aggregate(samples: &[Sample], window: &Window) -> Statistics {
    aggregate_with(samples, window, &AggregationPolicy::default())
}

/// Aggregates `samples` over `window` under an explicit quality policy.
pub fn aggregate_with<'a, I>(samples: I, window: &Window, policy: &AggregationPolicy) -> Statistics
where
    I: IntoIterator<Item = &'a Sample>,
{
    let mut acc = Accumulator::new(*window, *policy);
    for sample in samples {
        acc.push(sample);
    }
    acc.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
