//! Reading store collaborators.
//!
//! The analysis code never does I/O. Everything that fetches readings
//! implements `ReadingStore` and hands back a finite, in-memory list of
//! samples, converted to canonical units and names.
//!
//! - `memory`: in-process store for tests and replay.
//! - `database`: the `sensor_readings` table in PostgreSQL.
//! - `http`: the legacy REST backend.

use std::fmt;

use crate::model::{MetricKind, Sample, Window};

pub mod database;
pub mod http;
pub mod memory;

/// Identifies one time series: a sensor id or barangay name plus the
/// quantity measured there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub source_id: String,
    pub metric: MetricKind,
}

impl SeriesKey {
    pub fn new(source_id: impl Into<String>, metric: MetricKind) -> Self {
        SeriesKey { source_id: source_id.into(), metric }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.metric)
    }
}

/// Read access to persisted readings.
///
/// Implementations may return samples in any order and may include
/// samples outside `window`; the aggregator filters both.
pub trait ReadingStore {
    fn fetch_samples(&mut self, key: &SeriesKey, window: &Window) -> Result<Vec<Sample>, StoreError>;
}

/// Errors that can arise when reading stored samples.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Query or connection failure in the database.
    Database(String),
    /// Non-2xx HTTP response from the REST backend.
    Http(u16),
    /// The HTTP request could not be sent or the body could not be read.
    Request(String),
    /// The response or a stored row could not be decoded.
    Parse(String),
    /// Nothing is registered under this sensor / barangay id.
    UnknownSource(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
            StoreError::Http(code) => write!(f, "HTTP error: {}", code),
            StoreError::Request(msg) => write!(f, "Request failed: {}", msg),
            StoreError::Parse(msg) => write!(f, "Parse error: {}", msg),
            StoreError::UnknownSource(id) => write!(f, "Unknown source: {}", id),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<postgres::Error> for StoreError {
    fn from(err: postgres::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => StoreError::Http(status.as_u16()),
            None => StoreError::Request(err.to_string()),
        }
    }
}
