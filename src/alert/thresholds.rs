//! Flood risk threshold tables and classification.
//!
//! A table is an ordered list of bands. Each band covers every metric
//! strictly below its `upper` bound that the previous band did not cover,
//! so a metric exactly on a bound belongs to the NEXT (higher) band. The
//! last band is unbounded, which makes every finite metric map to exactly
//! one level.

use std::fmt;

use crate::model::{AnalysisError, MetricKind, RiskLevel};

/// One `(upper_bound, level)` row of a threshold table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Exclusive upper bound. `f64::INFINITY` for the last band.
    pub upper: f64,
    pub level: RiskLevel,
}

impl Band {
    pub fn below(upper: f64, level: RiskLevel) -> Self {
        Band { upper, level }
    }

    pub fn unbounded(level: RiskLevel) -> Self {
        Band { upper: f64::INFINITY, level }
    }
}

/// Why a threshold table was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdError {
    Empty,
    NanBound(usize),
    NotIncreasing { index: usize, previous: f64, upper: f64 },
    LevelsDecrease { index: usize },
    LastBandBounded(f64),
}

impl fmt::Display for ThresholdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdError::Empty => write!(f, "threshold table has no bands"),
            ThresholdError::NanBound(i) => write!(f, "band {} has a NaN upper bound", i),
            ThresholdError::NotIncreasing { index, previous, upper } => write!(
                f,
                "band {} upper bound {} is not above previous bound {}",
                index, upper, previous
            ),
            ThresholdError::LevelsDecrease { index } => {
                write!(f, "band {} is less severe than the band below it", index)
            }
            ThresholdError::LastBandBounded(upper) => {
                write!(f, "last band must be unbounded, found upper bound {}", upper)
            }
        }
    }
}

impl std::error::Error for ThresholdError {}

/// A validated, immutable threshold table.
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    bands: Vec<Band>,
}

impl ThresholdTable {
    pub fn new(bands: Vec<Band>) -> Result<Self, ThresholdError> {
        let last = bands.last().ok_or(ThresholdError::Empty)?;
        if last.upper != f64::INFINITY {
            return Err(ThresholdError::LastBandBounded(last.upper));
        }
        for (i, band) in bands.iter().enumerate() {
            if band.upper.is_nan() {
                return Err(ThresholdError::NanBound(i));
            }
            if i > 0 {
                let prev = &bands[i - 1];
                if band.upper <= prev.upper {
                    return Err(ThresholdError::NotIncreasing {
                        index: i,
                        previous: prev.upper,
                        upper: band.upper,
                    });
                }
                if band.level < prev.level {
                    return Err(ThresholdError::LevelsDecrease { index: i });
                }
            }
        }
        Ok(ThresholdTable { bands })
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Default table for a metric kind, or `None` for kinds that are
    /// displayed but never classified (temperature).
    pub fn default_for(kind: MetricKind) -> Option<Self> {
        use RiskLevel::*;
        let bounds = match kind {
            MetricKind::WaterLevel => [1.0, 2.0, 3.0],
            // PAGASA rainfall advisory bands, mm/h.
            MetricKind::Rainfall => [7.5, 15.0, 30.0],
            MetricKind::FlowVelocity => [0.5, 1.5, 3.0],
            MetricKind::RiskScore => [0.25, 0.5, 0.75],
            MetricKind::Temperature => return None,
        };
        let bands = vec![
            Band::below(bounds[0], Low),
            Band::below(bounds[1], Moderate),
            Band::below(bounds[2], High),
            Band::unbounded(Extreme),
        ];
        ThresholdTable::new(bands).ok()
    }
}

/// Maps a metric onto the table's risk scale.
///
/// Returns the level of the first band whose `upper` is strictly greater
/// than `metric`. NaN and infinities fail with `InvalidMetric` rather than
/// defaulting to a level.
pub fn classify(metric: f64, table: &ThresholdTable) -> Result<RiskLevel, AnalysisError> {
    if !metric.is_finite() {
        return Err(AnalysisError::InvalidMetric(metric));
    }
    let idx = table.bands.partition_point(|band| band.upper <= metric);
    // The last band is unbounded, so a finite metric always finds one.
    let band = table.bands.get(idx).or(table.bands.last());
    band.map(|b| b.level).ok_or(AnalysisError::InvalidMetric(metric))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
