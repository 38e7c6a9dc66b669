/// Window selection for dashboard queries.
///
/// Translates the `period` query parameter ("1h", "24h", ...) or explicit
/// start/end bounds into a concrete half-open `Window`.
///
/// # Clock injection
/// `select_window` takes `now` as a parameter and never calls
/// `Utc::now()` itself.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

use crate::model::{AnalysisError, Window};

// ---------------------------------------------------------------------------
// Period tokens
// ---------------------------------------------------------------------------

/// The fixed set of look-back periods offered by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneHour,
    SixHours,
    OneDay,
    SevenDays,
    ThirtyDays,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::OneHour,
        Period::SixHours,
        Period::OneDay,
        Period::SevenDays,
        Period::ThirtyDays,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Period::OneHour => "1h",
            Period::SixHours => "6h",
            Period::OneDay => "24h",
            Period::SevenDays => "7d",
            Period::ThirtyDays => "30d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Period::OneHour => Duration::hours(1),
            Period::SixHours => Duration::hours(6),
            Period::OneDay => Duration::hours(24),
            Period::SevenDays => Duration::days(7),
            Period::ThirtyDays => Duration::days(30),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for Period {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.token() == s)
            .ok_or_else(|| AnalysisError::InvalidWindowSpec(format!("unknown period '{}'", s)))
    }
}

// ---------------------------------------------------------------------------
// Window specs
// ---------------------------------------------------------------------------

/// What the caller asked for: a look-back period ending at `now`, or
/// explicit bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSpec {
    Period(Period),
    Explicit { start: DateTime<Utc>, end: DateTime<Utc> },
}

impl WindowSpec {
    /// Parses a raw period token, e.g. the `period` query parameter.
    pub fn parse(token: &str) -> Result<Self, AnalysisError> {
        token.parse().map(WindowSpec::Period)
    }
}

/// Resolves a `WindowSpec` against `now`.
///
/// A period yields `[now - duration, now)`. Explicit bounds are returned
/// as-is and must satisfy `start < end`.
pub fn select_window(spec: &WindowSpec, now: DateTime<Utc>) -> Result<Window, AnalysisError> {
    match *spec {
        WindowSpec::Period(period) => Ok(Window {
            start: now - period.duration(),
            end: now,
        }),
        WindowSpec::Explicit { start, end } => {
            if start >= end {
                return Err(AnalysisError::InvalidWindowSpec(format!(
                    "start {} is not before end {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                )));
            }
            Ok(Window { start, end })
        }
    }
}

/// Convenience wrapper for route handlers that only have the raw token.
pub fn select_window_from_token(token: &str, now: DateTime<Utc>) -> Result<Window, AnalysisError> {
    select_window(&WindowSpec::parse(token)?, now)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
