/// End-to-end tests for the window → aggregate → classify pipeline
///
/// Tests verify:
/// 1. A 24h window over hourly readings picks up every reading
/// 2. Real-time risk follows the latest reading, not the mean
/// 3. Bad readings in the store never reach the statistics
/// 4. The same pipeline through `FloodService` gives the same answer
///
/// Everything runs against `MemoryStore`; no database or network needed.

use brgy_flood_service::alert::thresholds::{classify, Band, ThresholdTable};
use brgy_flood_service::analysis::aggregate::aggregate;
use brgy_flood_service::analysis::window::{select_window, select_window_from_token, WindowSpec};
use brgy_flood_service::config::ThresholdConfig;
use brgy_flood_service::ingest::memory::MemoryStore;
use brgy_flood_service::ingest::{ReadingStore, SeriesKey};
use brgy_flood_service::logging::Logger;
use brgy_flood_service::model::{MetricKind, Quality, RiskLevel, Sample};
use brgy_flood_service::service::FloodService;
use chrono::{DateTime, Duration, TimeZone, Utc};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn hour(h: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 24, 0, 0, 0).unwrap() + Duration::hours(h)
}

fn reference_table() -> ThresholdTable {
    ThresholdTable::new(vec![
        Band::below(1.0, RiskLevel::Low),
        Band::below(2.0, RiskLevel::Moderate),
        Band::below(3.0, RiskLevel::High),
        Band::unbounded(RiskLevel::Extreme),
    ])
    .expect("reference table is valid")
}

/// 24 hourly water levels hovering around 1.0-1.1 m, with a spike to
/// 3.5 m in the last hour. Inserted newest-first to make sure nothing
/// depends on input order.
fn typhoon_spike_store(key: &SeriesKey) -> MemoryStore {
    let mut store = MemoryStore::new();
    for h in (0..24).rev() {
        let value = if h == 23 { 3.5 } else { 1.0 + 0.1 * (h % 2) as f64 };
        store.insert(key.clone(), Sample::ok(hour(h), value));
    }
    store
}

// ---------------------------------------------------------------------------
// 1. Pipeline with plain functions
// ---------------------------------------------------------------------------

#[test]
fn test_latest_spike_drives_real_time_risk() {
    let key = SeriesKey::new("SN-MARIKINA-01", MetricKind::WaterLevel);
    let mut store = typhoon_spike_store(&key);

    let window = select_window_from_token("24h", hour(24)).expect("24h is a valid period");
    assert_eq!(window.start, hour(0));
    assert_eq!(window.end, hour(24));

    let samples = store.fetch_samples(&key, &window).expect("series is registered");
    let stats = aggregate(&samples, &window);
    assert_eq!(stats.count, 24);
    assert_eq!(stats.latest, Some(3.5));
    assert_eq!(stats.latest_at, Some(hour(23)));
    assert_eq!(stats.max, Some(3.5));
    assert_eq!(stats.min, Some(1.0));

    let table = reference_table();
    let latest_level = classify(stats.latest.unwrap(), &table).unwrap();
    let mean_level = classify(stats.mean.unwrap(), &table).unwrap();
    assert_eq!(latest_level, RiskLevel::Extreme, "spike at hour 23 must show as extreme");
    assert_eq!(mean_level, RiskLevel::Moderate, "the mean hides the spike");
    assert!(latest_level > mean_level);
}

#[test]
fn test_shorter_window_excludes_older_readings() {
    let key = SeriesKey::new("SN-MARIKINA-01", MetricKind::WaterLevel);
    let mut store = typhoon_spike_store(&key);

    let window = select_window_from_token("6h", hour(24)).unwrap();
    let samples = store.fetch_samples(&key, &window).unwrap();
    let stats = aggregate(&samples, &window);
    assert_eq!(stats.count, 6, "hours 18..=23 fall inside [18h, 24h)");
}

#[test]
fn test_reading_at_window_end_is_excluded() {
    let key = SeriesKey::new("SN-MARIKINA-01", MetricKind::WaterLevel);
    let mut store = typhoon_spike_store(&key);
    store.insert(key.clone(), Sample::ok(hour(24), 9.9));

    let window = select_window_from_token("24h", hour(24)).unwrap();
    let stats = aggregate(&store.fetch_samples(&key, &window).unwrap(), &window);
    assert_eq!(stats.count, 24);
    assert_eq!(stats.latest, Some(3.5));
}

#[test]
fn test_error_readings_in_store_never_reach_statistics() {
    let key = SeriesKey::new("SN-MARIKINA-01", MetricKind::WaterLevel);
    let mut store = typhoon_spike_store(&key);
    store.insert(
        key.clone(),
        Sample { timestamp: hour(23) + Duration::minutes(30), value: Some(99.0), quality: Quality::Error },
    );
    store.insert(
        key.clone(),
        Sample { timestamp: hour(23) + Duration::minutes(45), value: None, quality: Quality::Missing },
    );

    let window = select_window_from_token("24h", hour(24)).unwrap();
    let stats = aggregate(&store.fetch_samples(&key, &window).unwrap(), &window);
    assert_eq!(stats.count, 24);
    assert_eq!(stats.observed, 26);
    assert_eq!(stats.max, Some(3.5));
    assert_eq!(stats.latest, Some(3.5));
}

#[test]
fn test_explicit_window_selects_calm_period() {
    let key = SeriesKey::new("SN-MARIKINA-01", MetricKind::WaterLevel);
    let mut store = typhoon_spike_store(&key);

    let spec = WindowSpec::Explicit { start: hour(0), end: hour(12) };
    let window = select_window(&spec, hour(24)).unwrap();
    let stats = aggregate(&store.fetch_samples(&key, &window).unwrap(), &window);
    assert_eq!(stats.count, 12);
    assert_eq!(classify(stats.latest.unwrap(), &reference_table()), Ok(RiskLevel::Moderate));
}

// ---------------------------------------------------------------------------
// 2. Pipeline through FloodService
// ---------------------------------------------------------------------------

#[test]
fn test_service_report_matches_manual_pipeline() {
    let key = SeriesKey::new("SN-MARIKINA-01", MetricKind::WaterLevel);
    let store = typhoon_spike_store(&key);
    let mut service = FloodService::new(store, ThresholdConfig::default(), Logger::silent());

    let report = service
        .metric_report_at(&key, &WindowSpec::parse("24h").unwrap(), hour(24))
        .expect("report should succeed");

    assert_eq!(report.stats.count, 24);
    assert_eq!(report.stats.latest, Some(3.5));
    assert_eq!(report.risk.as_ref().map(|r| r.level), Some(RiskLevel::Extreme));
    assert!(!report.stale, "latest reading is one hour old, default limit is 60 minutes");
}

#[test]
fn test_service_report_goes_stale_when_sensor_goes_quiet() {
    let key = SeriesKey::new("SN-MARIKINA-01", MetricKind::WaterLevel);
    let store = typhoon_spike_store(&key);
    let mut service = FloodService::new(store, ThresholdConfig::default(), Logger::silent());

    // Three hours after the last reading the spike is still the latest value.
    let report = service
        .metric_report_at(&key, &WindowSpec::parse("24h").unwrap(), hour(26))
        .unwrap();
    assert!(report.stale);
    assert_eq!(report.risk.map(|r| r.level), Some(RiskLevel::Extreme));
}

#[test]
fn test_service_reports_are_deterministic() {
    let key = SeriesKey::new("SN-MARIKINA-01", MetricKind::WaterLevel);
    let mut service =
        FloodService::new(typhoon_spike_store(&key), ThresholdConfig::default(), Logger::silent());
    let spec = WindowSpec::parse("7d").unwrap();

    let first = service.metric_report_at(&key, &spec, hour(24)).unwrap();
    let second = service.metric_report_at(&key, &spec, hour(24)).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.stats.mean.map(f64::to_bits),
        second.stats.mean.map(f64::to_bits)
    );
}
