//! Request-level orchestration for the dashboard routes.
//!
//! `FloodService` owns its collaborators explicitly: the reading store, the
//! threshold configuration and the logger are all passed in at construction.
//! Each call is independent; the only state is the store's connection.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

use crate::alert::stalenesses::{age_at, is_stale_at};
use crate::analysis::aggregate::aggregate_with;
use crate::analysis::series::{bucketize, Bucket};
use crate::analysis::window::{select_window, WindowSpec};
use crate::config::{ThresholdConfig, DEFAULT_STALE_MINUTES};
use crate::ingest::{ReadingStore, SeriesKey, StoreError};
use crate::logging::{Component, Logger};
use crate::model::{AnalysisError, MetricKind, RiskLevel, Sample, Statistics, Window};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    Analysis(AnalysisError),
    Store(StoreError),
}

impl ServiceError {
    /// HTTP status the route layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Analysis(AnalysisError::InvalidWindowSpec(_)) => 400,
            ServiceError::Analysis(AnalysisError::InvalidMetric(_)) => 422,
            ServiceError::Analysis(AnalysisError::NoThresholds(_)) => 500,
            ServiceError::Store(StoreError::UnknownSource(_)) => 404,
            ServiceError::Store(_) => 502,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Analysis(e) => write!(f, "{}", e),
            ServiceError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Analysis(e) => Some(e),
            ServiceError::Store(e) => Some(e),
        }
    }
}

impl From<AnalysisError> for ServiceError {
    fn from(err: AnalysisError) -> Self {
        ServiceError::Analysis(err)
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err)
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A classified level with its presentation attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub label: &'static str,
    pub color: &'static str,
}

impl From<RiskLevel> for RiskAssessment {
    fn from(level: RiskLevel) -> Self {
        RiskAssessment {
            level,
            label: level.label(),
            color: level.color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReport {
    pub source_id: String,
    pub metric: MetricKind,
    pub unit: &'static str,
    pub window: Window,
    pub stats: Statistics,
    /// Classification of `stats.latest`. `None` without data or without a
    /// threshold table for the metric.
    pub risk: Option<RiskAssessment>,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarangayOverview {
    pub barangay: String,
    pub reports: Vec<MetricReport>,
    /// Most severe level among the reports.
    pub overall: Option<RiskLevel>,
}

/// Classifies a single value without a store or logger.
pub fn assess(thresholds: &ThresholdConfig, kind: MetricKind, metric: f64) -> Result<RiskAssessment, ServiceError> {
    Ok(thresholds.classify(kind, metric)?.into())
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct FloodService<S: ReadingStore> {
    store: S,
    thresholds: ThresholdConfig,
    logger: Logger,
    stale_after: Duration,
}

impl<S: ReadingStore> FloodService<S> {
    pub fn new(store: S, thresholds: ThresholdConfig, logger: Logger) -> Self {
        FloodService {
            store,
            thresholds,
            logger,
            stale_after: Duration::minutes(DEFAULT_STALE_MINUTES),
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    fn resolve_window(&self, key: &SeriesKey, spec: &WindowSpec, now: DateTime<Utc>) -> Result<Window, ServiceError> {
        let window = select_window(spec, now).inspect_err(|e| {
            self.logger.warn(Component::Window, Some(&key.source_id), &e.to_string());
        })?;
        self.logger.debug(
            Component::Window,
            Some(&key.source_id),
            &format!("window {} .. {}", window.start.to_rfc3339(), window.end.to_rfc3339()),
        );
        Ok(window)
    }

    fn fetch(&mut self, key: &SeriesKey, window: &Window) -> Result<Vec<Sample>, StoreError> {
        self.store.fetch_samples(key, window).inspect_err(|e| {
            self.logger.log_store_failure(&key.source_id, &format!("fetch {}", key.metric), e);
        })
    }

    /// Classifies a metric for `kind`, e.g. a prediction score supplied by
    /// the route layer rather than read from the store.
    pub fn classify_value(&self, kind: MetricKind, metric: f64) -> Result<RiskAssessment, ServiceError> {
        assess(&self.thresholds, kind, metric).inspect_err(|e| {
            self.logger.error(Component::Classify, None, &format!("{} value rejected: {}", kind, e));
        })
    }

    /// Window → fetch → aggregate → classify `latest` → staleness.
    pub fn metric_report_at(
        &mut self,
        key: &SeriesKey,
        spec: &WindowSpec,
        now: DateTime<Utc>,
    ) -> Result<MetricReport, ServiceError> {
        let window = self.resolve_window(key, spec, now)?;
        let samples = self.fetch(key, &window)?;

        let stats = aggregate_with(&samples, &window, &self.thresholds.policy);
        self.logger.debug(
            Component::Aggregate,
            Some(&key.source_id),
            &format!("{}: {} of {} readings usable", key.metric, stats.count, stats.observed),
        );

        let risk = match stats.latest {
            None => None,
            Some(latest) => match self.thresholds.classify(key.metric, latest) {
                Ok(level) => Some(RiskAssessment::from(level)),
                Err(AnalysisError::NoThresholds(_)) => None,
                Err(e) => {
                    self.logger.error(Component::Classify, Some(&key.source_id), &e.to_string());
                    return Err(e.into());
                }
            },
        };

        let stale = is_stale_at(&stats, self.stale_after, now);
        if let (true, Some(age)) = (stale, age_at(&stats, now)) {
            self.logger.warn(
                Component::System,
                Some(&key.source_id),
                &format!(
                    "{} latest reading is {} minutes old (limit {})",
                    key.metric,
                    age.num_minutes(),
                    self.stale_after.num_minutes()
                ),
            );
        }

        Ok(MetricReport {
            source_id: key.source_id.clone(),
            metric: key.metric,
            unit: key.metric.unit(),
            window,
            stats,
            risk,
            stale,
        })
    }

    pub fn metric_report(&mut self, key: &SeriesKey, spec: &WindowSpec) -> Result<MetricReport, ServiceError> {
        self.metric_report_at(key, spec, Utc::now())
    }

    /// Per-bucket statistics for a chart.
    pub fn chart_series_at(
        &mut self,
        key: &SeriesKey,
        spec: &WindowSpec,
        bucket_width: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<Bucket>, ServiceError> {
        let window = self.resolve_window(key, spec, now)?;
        let samples = self.fetch(key, &window)?;
        Ok(bucketize(&samples, &window, bucket_width, &self.thresholds.policy)?)
    }

    /// One report per metric for a barangay, plus the most severe level.
    ///
    /// Metrics the barangay has no series for are skipped; any other
    /// failure aborts the overview.
    pub fn barangay_overview_at(
        &mut self,
        barangay: &str,
        metrics: &[MetricKind],
        spec: &WindowSpec,
        now: DateTime<Utc>,
    ) -> Result<BarangayOverview, ServiceError> {
        let mut reports = Vec::with_capacity(metrics.len());
        for &metric in metrics {
            let key = SeriesKey::new(barangay, metric);
            match self.metric_report_at(&key, spec, now) {
                Ok(report) => reports.push(report),
                Err(ServiceError::Store(StoreError::UnknownSource(_))) => continue,
                Err(e) => return Err(e),
            }
        }

        let overall = reports
            .iter()
            .filter_map(|r| r.risk.as_ref().map(|a| a.level))
            .max();
        if let Some(level) = overall {
            self.logger.info(
                Component::Classify,
                Some(barangay),
                &format!("overall risk {} ({} metrics)", level, reports.len()),
            );
        }

        Ok(BarangayOverview {
            barangay: barangay.to_string(),
            reports,
            overall,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::memory::MemoryStore;
    use crate::model::Quality;
    use chrono::TimeZone;

    /// A fixed "now" used across all tests: 2024-07-24 12:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 24, 12, 0, 0).unwrap()
    }

    fn service(store: MemoryStore) -> FloodService<MemoryStore> {
        FloodService::new(store, ThresholdConfig::default(), Logger::silent())
    }

    fn day() -> WindowSpec {
        WindowSpec::parse("24h").unwrap()
    }

    /// A store that is always down.
    struct BrokenStore;

    impl ReadingStore for BrokenStore {
        fn fetch_samples(&mut self, _key: &SeriesKey, _window: &Window) -> Result<Vec<Sample>, StoreError> {
            Err(StoreError::Http(503))
        }
    }

    #[test]
    fn test_report_classifies_latest_reading() {
        let key = SeriesKey::new("SN-1", MetricKind::WaterLevel);
        let mut store = MemoryStore::new();
        store.insert(key.clone(), Sample::ok(fixed_now() - Duration::minutes(10), 2.4));
        store.insert(key.clone(), Sample::ok(fixed_now() - Duration::hours(5), 0.6));

        let report = service(store).metric_report_at(&key, &day(), fixed_now()).unwrap();
        assert_eq!(report.stats.count, 2);
        assert_eq!(report.risk.map(|r| r.level), Some(RiskLevel::High));
        assert!(!report.stale);
        assert_eq!(report.unit, "m");
    }

    #[test]
    fn test_report_without_data_has_no_risk_and_is_stale() {
        let key = SeriesKey::new("SN-1", MetricKind::WaterLevel);
        let mut store = MemoryStore::new();
        store.register(key.clone());

        let report = service(store).metric_report_at(&key, &day(), fixed_now()).unwrap();
        assert_eq!(report.stats, Statistics::empty());
        assert_eq!(report.risk, None);
        assert!(report.stale);
    }

    #[test]
    fn test_old_latest_reading_is_flagged_stale() {
        let key = SeriesKey::new("SN-1", MetricKind::Rainfall);
        let mut store = MemoryStore::new();
        store.insert(key.clone(), Sample::ok(fixed_now() - Duration::hours(3), 18.0));

        let mut svc = service(store).with_stale_after(Duration::minutes(30));
        let report = svc.metric_report_at(&key, &day(), fixed_now()).unwrap();
        assert!(report.stale);
        assert_eq!(report.risk.map(|r| r.level), Some(RiskLevel::High));
    }

    #[test]
    fn test_temperature_is_reported_but_not_classified() {
        let key = SeriesKey::new("SN-1", MetricKind::Temperature);
        let mut store = MemoryStore::new();
        store.insert(key.clone(), Sample::ok(fixed_now() - Duration::minutes(1), 31.5));

        let report = service(store).metric_report_at(&key, &day(), fixed_now()).unwrap();
        assert_eq!(report.stats.latest, Some(31.5));
        assert_eq!(report.risk, None);
    }

    #[test]
    fn test_invalid_period_maps_to_400() {
        let key = SeriesKey::new("SN-1", MetricKind::WaterLevel);
        let mut store = MemoryStore::new();
        store.register(key.clone());
        let spec = WindowSpec::Explicit { start: fixed_now(), end: fixed_now() - Duration::hours(1) };

        let err = service(store).metric_report_at(&key, &spec, fixed_now()).unwrap_err();
        assert!(matches!(err, ServiceError::Analysis(AnalysisError::InvalidWindowSpec(_))));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_unknown_source_maps_to_404() {
        let key = SeriesKey::new("SN-404", MetricKind::WaterLevel);
        let err = service(MemoryStore::new())
            .metric_report_at(&key, &day(), fixed_now())
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_store_outage_maps_to_502() {
        let mut svc = FloodService::new(BrokenStore, ThresholdConfig::default(), Logger::silent());
        let key = SeriesKey::new("SN-1", MetricKind::WaterLevel);
        let err = svc.metric_report_at(&key, &day(), fixed_now()).unwrap_err();
        assert_eq!(err, ServiceError::Store(StoreError::Http(503)));
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_classify_value_rejects_nan_with_422() {
        let svc = service(MemoryStore::new());
        let err = svc.classify_value(MetricKind::RiskScore, f64::NAN).unwrap_err();
        assert_eq!(err.status_code(), 422);
        let ok = svc.classify_value(MetricKind::RiskScore, 0.8).unwrap();
        assert_eq!(ok.level, RiskLevel::Extreme);
        assert_eq!(ok.color, "#9c27b0");
    }

    #[test]
    fn test_assess_needs_only_thresholds() {
        let thresholds = ThresholdConfig::default();
        let assessment = assess(&thresholds, MetricKind::WaterLevel, 1.0).unwrap();
        assert_eq!(assessment.level, RiskLevel::Moderate);
        assert_eq!(assessment.label, "Moderate Risk");
        assert_eq!(
            assess(&thresholds, MetricKind::WaterLevel, f64::INFINITY),
            Err(ServiceError::Analysis(AnalysisError::InvalidMetric(f64::INFINITY)))
        );
    }

    #[test]
    fn test_classify_value_without_table_maps_to_500() {
        let svc = service(MemoryStore::new());
        let err = svc.classify_value(MetricKind::Temperature, 30.0).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_overview_takes_most_severe_level_and_skips_missing_series() {
        let mut store = MemoryStore::new();
        let t = fixed_now() - Duration::minutes(5);
        store.insert(SeriesKey::new("Tumana", MetricKind::WaterLevel), Sample::ok(t, 1.2));
        store.insert(SeriesKey::new("Tumana", MetricKind::Rainfall), Sample::ok(t, 35.0));

        let overview = service(store)
            .barangay_overview_at(
                "Tumana",
                &[MetricKind::WaterLevel, MetricKind::Rainfall, MetricKind::FlowVelocity],
                &day(),
                fixed_now(),
            )
            .unwrap();
        assert_eq!(overview.reports.len(), 2);
        assert_eq!(overview.overall, Some(RiskLevel::Extreme));
    }

    #[test]
    fn test_overview_propagates_store_outage() {
        let mut svc = FloodService::new(BrokenStore, ThresholdConfig::default(), Logger::silent());
        let result = svc.barangay_overview_at("Tumana", &[MetricKind::WaterLevel], &day(), fixed_now());
        assert!(result.is_err());
    }

    #[test]
    fn test_chart_series_uses_store_samples() {
        let key = SeriesKey::new("SN-1", MetricKind::Rainfall);
        let mut store = MemoryStore::new();
        for h in 0..6 {
            store.insert(key.clone(), Sample::ok(fixed_now() - Duration::hours(h) - Duration::minutes(30), h as f64));
        }
        store.insert(
            key.clone(),
            Sample {
                timestamp: fixed_now() - Duration::minutes(20),
                value: Some(500.0),
                quality: Quality::Error,
            },
        );

        let spec = WindowSpec::parse("6h").unwrap();
        let buckets = service(store)
            .chart_series_at(&key, &spec, Duration::hours(1), fixed_now())
            .unwrap();
        assert_eq!(buckets.len(), 6);
        assert_eq!(buckets[5].stats.latest, Some(0.0));
        assert_eq!(buckets[5].stats.observed, 2);
        assert_eq!(buckets[0].stats.latest, Some(5.0));
    }

    #[test]
    fn test_report_serializes_for_the_dashboard() {
        let key = SeriesKey::new("SN-1", MetricKind::WaterLevel);
        let mut store = MemoryStore::new();
        store.insert(key.clone(), Sample::ok(fixed_now() - Duration::minutes(10), 0.4));

        let report = service(store).metric_report_at(&key, &day(), fixed_now()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sourceId"], "SN-1");
        assert_eq!(json["metric"], "water_level");
        assert_eq!(json["risk"]["level"], "low");
        assert_eq!(json["risk"]["color"], "#4caf50");
        assert_eq!(json["stats"]["latest"], 0.4);
    }
}
