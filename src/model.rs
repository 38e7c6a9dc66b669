/// Core data types for the barangay flood monitoring service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O; only types, their display helpers, and the error
/// kinds raised by the window selector and the risk classifier.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Metric kinds
// ---------------------------------------------------------------------------

/// The physical quantity a series of samples measures.
///
/// Values are always stored in the canonical unit noted on each variant;
/// unit conversion happens only in the `ingest` collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Water level above gauge datum, in meters.
    WaterLevel,
    /// Rainfall intensity, in millimeters per hour.
    Rainfall,
    /// Surface flow velocity, in meters per second.
    FlowVelocity,
    /// Air temperature, in degrees Celsius.
    Temperature,
    /// Composite flood risk score, unitless in `[0, 1]`.
    RiskScore,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::WaterLevel,
        MetricKind::Rainfall,
        MetricKind::FlowVelocity,
        MetricKind::Temperature,
        MetricKind::RiskScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::WaterLevel => "water_level",
            MetricKind::Rainfall => "rainfall",
            MetricKind::FlowVelocity => "flow_velocity",
            MetricKind::Temperature => "temperature",
            MetricKind::RiskScore => "risk_score",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::WaterLevel => "m",
            MetricKind::Rainfall => "mm/h",
            MetricKind::FlowVelocity => "m/s",
            MetricKind::Temperature => "°C",
            MetricKind::RiskScore => "",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown metric kind '{}'", s))
    }
}

// ---------------------------------------------------------------------------
// Sample types
// ---------------------------------------------------------------------------

/// Quality flag attached to every stored reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Ok,
    Missing,
    Estimated,
    Error,
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ok" | "good" | "valid" => Ok(Quality::Ok),
            "missing" | "" => Ok(Quality::Missing),
            "estimated" => Ok(Quality::Estimated),
            "error" | "invalid" => Ok(Quality::Error),
            other => Err(format!("unknown quality flag '{}'", other)),
        }
    }
}

/// One timestamped sensor or environmental reading.
///
/// Immutable once stored. `value` is `None` when the sensor reported nothing
/// for that slot; such samples never contribute to numeric statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
    pub quality: Quality,
}

impl Sample {
    pub fn ok(timestamp: DateTime<Utc>, value: f64) -> Self {
        Sample { timestamp, value: Some(value), quality: Quality::Ok }
    }
}

// ---------------------------------------------------------------------------
// Window and statistics
// ---------------------------------------------------------------------------

/// Half-open time interval `[start, end)`.
///
/// Only `analysis::window` constructs windows from user input, and it
/// guarantees `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Summary of the samples that fell inside a window.
///
/// Every numeric field is `None` when `count == 0`: zero is a valid reading,
/// `None` means "no data".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Samples that contributed to the numeric fields.
    pub count: usize,
    /// All samples inside the window, whatever their quality.
    pub observed: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub sum: Option<f64>,
    pub latest: Option<f64>,
    pub latest_at: Option<DateTime<Utc>>,
}

impl Statistics {
    pub fn empty() -> Self {
        Statistics {
            count: 0,
            observed: 0,
            min: None,
            max: None,
            mean: None,
            sum: None,
            latest: None,
            latest_at: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

// ---------------------------------------------------------------------------
// Risk levels
// ---------------------------------------------------------------------------

/// Canonical flood risk scale, in ascending order of severity.
///
/// Other vocabularies (prediction records, five-band legends) are
/// translated through `alert::vocabulary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Extreme => "extreme",
        }
    }

    /// Display label used on dashboard cards and map legends.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
            RiskLevel::Extreme => "Extreme Risk",
        }
    }

    /// Hex color for charts and map layers.
    pub fn color(&self) -> &'static str {
        match self {
            RiskLevel::Low => "#4caf50",
            RiskLevel::Moderate => "#ff9800",
            RiskLevel::High => "#f44336",
            RiskLevel::Extreme => "#9c27b0",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("unknown risk level '{}'", s))
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the window selector and the risk classifier.
///
/// All of them are caller errors or upstream data corruption; none is
/// transient, so callers should never retry.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Unknown period token, or explicit bounds with `start >= end`.
    InvalidWindowSpec(String),
    /// NaN or infinite metric handed to the classifier.
    InvalidMetric(f64),
    /// No threshold table is configured for this metric kind.
    NoThresholds(MetricKind),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidWindowSpec(msg) => write!(f, "Invalid window spec: {}", msg),
            AnalysisError::InvalidMetric(value) => write!(f, "Invalid metric: {}", value),
            AnalysisError::NoThresholds(kind) => {
                write!(f, "No threshold table configured for {}", kind)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
