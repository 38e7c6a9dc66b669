//! Service configuration.
//!
//! Threshold tables live in a TOML file loaded once at startup; everything
//! else comes from the environment (optionally via `.env`). Metric kinds the
//! file does not mention keep their built-in tables.
//!
//! ```toml
//! [aggregation]
//! include_estimated = false
//!
//! [[water_level]]
//! upper = 1.0
//! level = "low"
//!
//! [[water_level]]   # no `upper`: unbounded
//! level = "extreme"
//! ```

use chrono::Duration;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::alert::thresholds::{classify, Band, ThresholdError, ThresholdTable};
use crate::analysis::aggregate::AggregationPolicy;
use crate::logging::LogLevel;
use crate::model::{AnalysisError, MetricKind, RiskLevel};

pub const DEFAULT_STALE_MINUTES: i64 = 60;
pub const DEFAULT_BARANGAYS_PATH: &str = "./barangays.toml";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(String),
    /// The configuration file is not valid TOML for this schema.
    Parse(String),
    /// A threshold table in the file failed validation.
    Thresholds { metric: MetricKind, error: ThresholdError },
    /// A required environment variable is not set.
    MissingEnv(&'static str),
    /// An environment variable is set but unusable.
    InvalidEnv { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Thresholds { metric, error } => {
                write!(f, "Invalid {} thresholds: {}", metric, error)
            }
            ConfigError::MissingEnv(name) => write!(f, "{} must be set", name),
            ConfigError::InvalidEnv { name, value } => {
                write!(f, "{} has invalid value '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Threshold configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawBand {
    upper: Option<f64>,
    level: RiskLevel,
}

#[derive(Debug, Default, Deserialize)]
struct RawAggregation {
    #[serde(default)]
    include_estimated: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThresholdFile {
    #[serde(default)]
    aggregation: RawAggregation,
    water_level: Option<Vec<RawBand>>,
    rainfall: Option<Vec<RawBand>>,
    flow_velocity: Option<Vec<RawBand>>,
    temperature: Option<Vec<RawBand>>,
    risk_score: Option<Vec<RawBand>>,
}

impl RawThresholdFile {
    fn take(&mut self, kind: MetricKind) -> Option<Vec<RawBand>> {
        match kind {
            MetricKind::WaterLevel => self.water_level.take(),
            MetricKind::Rainfall => self.rainfall.take(),
            MetricKind::FlowVelocity => self.flow_velocity.take(),
            MetricKind::Temperature => self.temperature.take(),
            MetricKind::RiskScore => self.risk_score.take(),
        }
    }
}

/// Read-only classification configuration, shared by every request.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdConfig {
    tables: HashMap<MetricKind, ThresholdTable>,
    pub policy: AggregationPolicy,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let tables = MetricKind::ALL
            .into_iter()
            .filter_map(|kind| ThresholdTable::default_for(kind).map(|t| (kind, t)))
            .collect();
        ThresholdConfig {
            tables,
            policy: AggregationPolicy::default(),
        }
    }
}

impl ThresholdConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut raw: RawThresholdFile =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut config = ThresholdConfig::default();
        config.policy.include_estimated = raw.aggregation.include_estimated;

        for kind in MetricKind::ALL {
            if let Some(raw_bands) = raw.take(kind) {
                let bands = raw_bands
                    .into_iter()
                    .map(|b| Band { upper: b.upper.unwrap_or(f64::INFINITY), level: b.level })
                    .collect();
                let table = ThresholdTable::new(bands)
                    .map_err(|error| ConfigError::Thresholds { metric: kind, error })?;
                config.tables.insert(kind, table);
            }
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn table_for(&self, kind: MetricKind) -> Option<&ThresholdTable> {
        self.tables.get(&kind)
    }

    /// Classifies `metric` with the table configured for `kind`.
    pub fn classify(&self, kind: MetricKind, metric: f64) -> Result<RiskLevel, AnalysisError> {
        let table = self.table_for(kind).ok_or(AnalysisError::NoThresholds(kind))?;
        classify(metric, table)
    }
}

// ---------------------------------------------------------------------------
// Environment configuration
// ---------------------------------------------------------------------------

/// Runtime settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub database_url: Option<String>,
    pub api_base: Option<String>,
    pub thresholds_path: Option<PathBuf>,
    pub barangays_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub log_level: LogLevel,
    pub stale_after: Duration,
}

impl ServiceConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable lookup; `from_env` passes the
    /// process environment, tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = non_empty("DATABASE_URL");
        let api_base = non_empty("FLOOD_API_BASE");
        if database_url.is_none() && api_base.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let log_level = match non_empty("FLOOD_LOG_LEVEL") {
            Some(v) => v.parse::<LogLevel>().map_err(|_| ConfigError::InvalidEnv {
                name: "FLOOD_LOG_LEVEL",
                value: v.clone(),
            })?,
            None => LogLevel::Info,
        };

        let stale_minutes = match non_empty("FLOOD_STALE_MINUTES") {
            Some(v) => match v.trim().parse::<i64>() {
                Ok(m) if m > 0 => m,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        name: "FLOOD_STALE_MINUTES",
                        value: v.clone(),
                    })
                }
            },
            None => DEFAULT_STALE_MINUTES,
        };

        Ok(ServiceConfig {
            database_url,
            api_base,
            thresholds_path: non_empty("FLOOD_THRESHOLDS").map(PathBuf::from),
            barangays_path: non_empty("FLOOD_BARANGAYS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BARANGAYS_PATH)),
            log_file: non_empty("FLOOD_LOG_FILE").map(PathBuf::from),
            log_level,
            stale_after: Duration::minutes(stale_minutes),
        })
    }

    /// Threshold tables from `FLOOD_THRESHOLDS`, or the built-in defaults.
    pub fn load_thresholds(&self) -> Result<ThresholdConfig, ConfigError> {
        match &self.thresholds_path {
            Some(path) => ThresholdConfig::load(path),
            None => Ok(ThresholdConfig::default()),
        }
    }

    /// Threshold tables alone. Needs neither `DATABASE_URL` nor
    /// `FLOOD_API_BASE`.
    pub fn thresholds_from_env() -> Result<ThresholdConfig, ConfigError> {
        dotenv::dotenv().ok();
        Self::thresholds_from_lookup(|name| std::env::var(name).ok())
    }

    pub fn thresholds_from_lookup<F>(lookup: F) -> Result<ThresholdConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("FLOOD_THRESHOLDS").filter(|v| !v.trim().is_empty()) {
            Some(path) => ThresholdConfig::load(path),
            None => Ok(ThresholdConfig::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    // --- Threshold file -----------------------------------------------------

    #[test]
    fn test_empty_file_keeps_defaults() {
        let config = ThresholdConfig::from_toml_str("").unwrap();
        assert_eq!(config, ThresholdConfig::default());
        assert!(!config.policy.include_estimated);
    }

    #[test]
    fn test_file_overrides_one_kind() {
        let text = r#"
            [[water_level]]
            upper = 0.5
            level = "low"

            [[water_level]]
            level = "high"
        "#;
        let config = ThresholdConfig::from_toml_str(text).unwrap();
        assert_eq!(config.classify(MetricKind::WaterLevel, 0.7), Ok(RiskLevel::High));
        assert_eq!(
            config.table_for(MetricKind::Rainfall),
            ThresholdTable::default_for(MetricKind::Rainfall).as_ref()
        );
    }

    #[test]
    fn test_file_can_add_a_temperature_table() {
        let text = r#"
            [[temperature]]
            upper = 35.0
            level = "low"

            [[temperature]]
            level = "moderate"
        "#;
        let config = ThresholdConfig::from_toml_str(text).unwrap();
        assert_eq!(config.classify(MetricKind::Temperature, 36.0), Ok(RiskLevel::Moderate));
    }

    #[test]
    fn test_aggregation_section_sets_policy() {
        let config = ThresholdConfig::from_toml_str("[aggregation]\ninclude_estimated = true\n").unwrap();
        assert!(config.policy.include_estimated);
    }

    #[test]
    fn test_invalid_table_names_the_metric() {
        let text = r#"
            [[rainfall]]
            upper = 10.0
            level = "low"
        "#;
        let result = ThresholdConfig::from_toml_str(text);
        assert_eq!(
            result,
            Err(ConfigError::Thresholds {
                metric: MetricKind::Rainfall,
                error: ThresholdError::LastBandBounded(10.0),
            })
        );
    }

    #[test]
    fn test_unknown_level_is_a_parse_error() {
        let text = "[[rainfall]]\nlevel = \"severe\"\n";
        assert!(matches!(ThresholdConfig::from_toml_str(text), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_section_is_a_parse_error() {
        let text = "[[humidity]]\nlevel = \"low\"\n";
        assert!(matches!(ThresholdConfig::from_toml_str(text), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_temperature_has_no_default_table() {
        let config = ThresholdConfig::default();
        assert_eq!(
            config.classify(MetricKind::Temperature, 30.0),
            Err(AnalysisError::NoThresholds(MetricKind::Temperature))
        );
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = ThresholdConfig::load("./does-not-exist.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    // --- Environment ----------------------------------------------------------

    #[test]
    fn test_env_requires_a_store() {
        assert_eq!(
            ServiceConfig::from_lookup(env(&[])),
            Err(ConfigError::MissingEnv("DATABASE_URL"))
        );
    }

    #[test]
    fn test_env_defaults() {
        let config =
            ServiceConfig::from_lookup(env(&[("DATABASE_URL", "postgres://localhost/flood")])).unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.stale_after, Duration::minutes(DEFAULT_STALE_MINUTES));
        assert_eq!(config.thresholds_path, None);
        assert_eq!(config.barangays_path, PathBuf::from(DEFAULT_BARANGAYS_PATH));
        assert_eq!(config.api_base, None);
    }

    #[test]
    fn test_env_reads_every_variable() {
        let config = ServiceConfig::from_lookup(env(&[
            ("FLOOD_API_BASE", "http://localhost:5000"),
            ("FLOOD_THRESHOLDS", "thresholds.toml"),
            ("FLOOD_LOG_FILE", "flood.log"),
            ("FLOOD_LOG_LEVEL", "debug"),
            ("FLOOD_STALE_MINUTES", "15"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:5000"));
        assert_eq!(config.thresholds_path, Some(PathBuf::from("thresholds.toml")));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.stale_after, Duration::minutes(15));
    }

    #[test]
    fn test_env_rejects_bad_stale_minutes() {
        for bad in ["0", "-5", "soon"] {
            let result = ServiceConfig::from_lookup(env(&[
                ("DATABASE_URL", "postgres://localhost/flood"),
                ("FLOOD_STALE_MINUTES", bad),
            ]));
            assert!(
                matches!(result, Err(ConfigError::InvalidEnv { name: "FLOOD_STALE_MINUTES", .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_thresholds_load_without_a_store() {
        let config = ServiceConfig::thresholds_from_lookup(env(&[])).unwrap();
        assert_eq!(config, ThresholdConfig::default());

        let config =
            ServiceConfig::thresholds_from_lookup(env(&[("FLOOD_THRESHOLDS", "./thresholds.toml")]))
                .unwrap();
        assert_eq!(config.classify(MetricKind::WaterLevel, 2.0), Ok(RiskLevel::High));
    }

    #[test]
    fn test_thresholds_from_missing_file_is_an_io_error() {
        let result =
            ServiceConfig::thresholds_from_lookup(env(&[("FLOOD_THRESHOLDS", "./does-not-exist.toml")]));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_blank_variables_count_as_unset() {
        let result = ServiceConfig::from_lookup(env(&[("DATABASE_URL", "  ")]));
        assert_eq!(result, Err(ConfigError::MissingEnv("DATABASE_URL")));
    }
}
