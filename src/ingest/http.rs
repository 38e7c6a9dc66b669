/// Legacy REST backend client
///
/// Reads sensor and environmental readings from the existing Express API.
/// Rows come back with the persisted column names (`water_level_m`,
/// `rainfall_mm`, ...); this is the only place those names appear.
///
/// Endpoint: `GET {base}/api/readings/{source_id}?metric=..&start=..&end=..`

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::{ReadingStore, SeriesKey, StoreError};
use crate::model::{MetricKind, Quality, Sample, Window};

const REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReadingsResponse {
    pub data: Vec<LegacyReading>,
}

/// One row as serialized by the legacy backend.
///
/// A row carries every column; only the one matching the requested metric
/// is used.
#[derive(Debug, Deserialize)]
pub struct LegacyReading {
    #[serde(alias = "recordedAt", alias = "timestamp")]
    pub recorded_at: String, // ISO 8601
    pub water_level_m: Option<f64>,
    pub rainfall_mm: Option<f64>, // hourly accumulation, i.e. mm/h
    pub flow_velocity_mps: Option<f64>,
    pub temperature_c: Option<f64>,
    pub risk_score: Option<f64>,
    pub quality: Option<String>,
}

impl LegacyReading {
    fn value_for(&self, metric: MetricKind) -> Option<f64> {
        match metric {
            MetricKind::WaterLevel => self.water_level_m,
            MetricKind::Rainfall => self.rainfall_mm,
            MetricKind::FlowVelocity => self.flow_velocity_mps,
            MetricKind::Temperature => self.temperature_c,
            MetricKind::RiskScore => self.risk_score,
        }
    }
}

/// Persisted column name for a metric, as the backend expects it in the
/// `metric` query parameter.
pub fn persisted_name(metric: MetricKind) -> &'static str {
    match metric {
        MetricKind::WaterLevel => "water_level_m",
        MetricKind::Rainfall => "rainfall_mm",
        MetricKind::FlowVelocity => "flow_velocity_mps",
        MetricKind::Temperature => "temperature_c",
        MetricKind::RiskScore => "risk_score",
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct HttpStore {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Parse(format!("invalid base URL '{}': {}", base_url, e)))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(HttpStore { client, base_url })
    }
}

impl ReadingStore for HttpStore {
    fn fetch_samples(&mut self, key: &SeriesKey, window: &Window) -> Result<Vec<Sample>, StoreError> {
        let url = build_readings_url(&self.base_url, key, window)?;

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::UnknownSource(key.source_id.clone()));
        }
        if !status.is_success() {
            return Err(StoreError::Http(status.as_u16()));
        }

        let text = response.text()?;
        parse_readings_json(&text, key.metric)
    }
}

/// Builds the readings URL, percent-encoding the source id.
pub fn build_readings_url(base: &Url, key: &SeriesKey, window: &Window) -> Result<Url, StoreError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StoreError::Parse(format!("base URL '{}' cannot have a path", base)))?
        .pop_if_empty()
        .extend(["api", "readings", key.source_id.as_str()]);
    url.query_pairs_mut()
        .append_pair("metric", persisted_name(key.metric))
        .append_pair("start", &format_instant(window.start))
        .append_pair("end", &format_instant(window.end));
    Ok(url)
}

fn format_instant(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a readings response body into samples for `metric`.
///
/// A row with a null metric column becomes a `Missing` sample, so it still
/// counts as observed.
pub fn parse_readings_json(body: &str, metric: MetricKind) -> Result<Vec<Sample>, StoreError> {
    let response: ReadingsResponse =
        serde_json::from_str(body).map_err(|e| StoreError::Parse(e.to_string()))?;

    response
        .data
        .into_iter()
        .map(|row| parse_row(row, metric))
        .collect()
}

fn parse_row(row: LegacyReading, metric: MetricKind) -> Result<Sample, StoreError> {
    let timestamp = DateTime::parse_from_rfc3339(&row.recorded_at)
        .map_err(|e| StoreError::Parse(format!("bad timestamp '{}': {}", row.recorded_at, e)))?
        .with_timezone(&Utc);

    let value = row.value_for(metric);
    let quality = match (&row.quality, value) {
        (_, None) => Quality::Missing,
        (None, Some(_)) => Quality::Ok,
        (Some(flag), Some(_)) => flag.parse().unwrap_or(Quality::Error),
    };

    Ok(Sample { timestamp, value, quality })
}

// ============================================================================
// Tests
// ============================================================================
