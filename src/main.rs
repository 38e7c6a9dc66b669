/// Command-line entry point for the flood risk service.
///
/// Prints the same JSON the dashboard routes return, which makes it handy
/// for checking a sensor from a shell during an event.
///
/// Usage:
///   brgy-flood report   <source_id> <metric> [period]
///   brgy-flood series   <source_id> <metric> [period] [bucket_minutes]
///   brgy-flood overview <barangay> [period]
///   brgy-flood classify <metric> <value>

use chrono::Duration;
use std::error::Error;
use std::fmt;
use std::process::ExitCode;

use brgy_flood_service::analysis::window::WindowSpec;
use brgy_flood_service::barangays::{find_barangay, load_registry};
use brgy_flood_service::config::ServiceConfig;
use brgy_flood_service::ingest::database::PostgresStore;
use brgy_flood_service::ingest::http::HttpStore;
use brgy_flood_service::ingest::{ReadingStore, SeriesKey};
use brgy_flood_service::logging::{Component, Logger};
use brgy_flood_service::model::MetricKind;
use brgy_flood_service::service::{assess, FloodService, ServiceError};

const USAGE: &str = "usage:
  brgy-flood report   <source_id> <metric> [period]
  brgy-flood series   <source_id> <metric> [period] [bucket_minutes]
  brgy-flood overview <barangay> [period]
  brgy-flood classify <metric> <value>

metrics: water_level, rainfall, flow_velocity, temperature, risk_score
periods: 1h, 6h, 24h (default), 7d, 30d";

const DEFAULT_PERIOD: &str = "24h";
const DEFAULT_BUCKET_MINUTES: i64 = 60;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "-h" || args[0] == "--help" {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.is::<UsageError>() {
                return ExitCode::from(2);
            }
            match e.downcast_ref::<ServiceError>() {
                Some(service_err) if service_err.status_code() < 500 => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

/// Bad command-line input: unknown subcommand, metric, number or barangay.
#[derive(Debug, Clone, PartialEq)]
struct UsageError(String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for UsageError {}

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    // Classification needs only the threshold tables, never a store.
    if args[0] == "classify" {
        let [_, metric, value] = args else {
            return Err(UsageError(USAGE.to_string()).into());
        };
        let thresholds = ServiceConfig::thresholds_from_env()?;
        let assessment = assess(&thresholds, parse_metric(metric)?, parse_value(value)?)?;
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    let config = ServiceConfig::from_env()?;
    let logger = Logger::new(config.log_level, config.log_file.clone(), false).with_stderr_console();
    let thresholds = config.load_thresholds()?;
    logger.debug(Component::Config, None, "threshold tables loaded");

    if let Some(base) = config.api_base.as_deref() {
        logger.info(Component::Store, None, &format!("reading from REST backend {}", base));
        let store = HttpStore::new(base)?;
        let service = FloodService::new(store, thresholds, logger).with_stale_after(config.stale_after);
        dispatch(service, &config, args)
    } else {
        let url = config.database_url.as_deref().ok_or("DATABASE_URL must be set")?;
        let store = PostgresStore::connect(url)?;
        let service = FloodService::new(store, thresholds, logger).with_stale_after(config.stale_after);
        dispatch(service, &config, args)
    }
}

fn dispatch<S: ReadingStore>(
    mut service: FloodService<S>,
    config: &ServiceConfig,
    args: &[String],
) -> Result<(), Box<dyn Error>> {
    let arg = |i: usize| args.get(i).map(String::as_str);
    let period = |i: usize| WindowSpec::parse(arg(i).unwrap_or(DEFAULT_PERIOD)).map_err(ServiceError::from);

    let json = match (arg(0), arg(1), arg(2)) {
        (Some("report"), Some(source_id), Some(metric)) => {
            let key = SeriesKey::new(source_id, parse_metric(metric)?);
            let report = service.metric_report(&key, &period(3)?)?;
            serde_json::to_string_pretty(&report)?
        }
        (Some("series"), Some(source_id), Some(metric)) => {
            let key = SeriesKey::new(source_id, parse_metric(metric)?);
            let width = match arg(4) {
                Some(m) => parse_bucket_minutes(m)?,
                None => Duration::minutes(DEFAULT_BUCKET_MINUTES),
            };
            let buckets = service.chart_series_at(&key, &period(3)?, width, chrono::Utc::now())?;
            serde_json::to_string_pretty(&buckets)?
        }
        (Some("overview"), Some(name), _) => {
            let registry = load_registry(&config.barangays_path)?;
            let barangay = find_barangay(&registry, name).ok_or_else(|| {
                UsageError(format!("barangay '{}' is not in {}", name, config.barangays_path.display()))
            })?;
            let overview = service.barangay_overview_at(
                &barangay.name,
                &barangay.metrics,
                &period(2)?,
                chrono::Utc::now(),
            )?;
            serde_json::to_string_pretty(&overview)?
        }
        _ => return Err(UsageError(USAGE.to_string()).into()),
    };

    println!("{}", json);
    Ok(())
}

fn parse_metric(s: &str) -> Result<MetricKind, UsageError> {
    s.parse::<MetricKind>().map_err(UsageError)
}

fn parse_value(s: &str) -> Result<f64, UsageError> {
    s.parse::<f64>().map_err(|_| UsageError(format!("invalid value '{}'", s)))
}

/// Bucket width in whole minutes, within the range chrono can represent.
fn parse_bucket_minutes(s: &str) -> Result<Duration, UsageError> {
    s.parse::<i64>()
        .ok()
        .and_then(Duration::try_minutes)
        .ok_or_else(|| UsageError(format!("invalid bucket minutes '{}'", s)))
}
