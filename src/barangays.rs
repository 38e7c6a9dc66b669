/// Barangay registry for the flood risk service.
///
/// Lists the barangays the dashboard covers and which metrics each one's
/// sensors are expected to report. Barangay names double as the
/// `source_id` of their area-level series, so `FloodService` can build an
/// overview from a registry entry without any other lookup.

use serde::Deserialize;
use std::path::Path;

use crate::config::ConfigError;
use crate::model::MetricKind;

/// Metadata for one monitored barangay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Barangay {
    /// Official barangay name, also the series `source_id`.
    pub name: String,
    /// City or municipality.
    pub city: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Metrics the barangay's sensors are expected to report.
    pub metrics: Vec<MetricKind>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    barangay: Vec<Barangay>,
}

/// Parses a registry from TOML text (`[[barangay]]` tables).
pub fn parse_registry(text: &str) -> Result<Vec<Barangay>, ConfigError> {
    let file: RegistryFile = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&file.barangay)?;
    Ok(file.barangay)
}

pub fn load_registry(path: impl AsRef<Path>) -> Result<Vec<Barangay>, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    parse_registry(&text)
}

fn validate(registry: &[Barangay]) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for b in registry {
        if b.name.trim().is_empty() {
            return Err(ConfigError::Parse("barangay with empty name".to_string()));
        }
        if !seen.insert(b.name.to_lowercase()) {
            return Err(ConfigError::Parse(format!("duplicate barangay '{}'", b.name)));
        }
        if b.metrics.is_empty() {
            return Err(ConfigError::Parse(format!("barangay '{}' lists no metrics", b.name)));
        }
    }
    Ok(())
}

/// Looks up a barangay by name, ignoring case. Returns `None` if not found.
pub fn find_barangay<'a>(registry: &'a [Barangay], name: &str) -> Option<&'a Barangay> {
    registry.iter().find(|b| b.name.eq_ignore_ascii_case(name))
}

/// Barangays expected to report a specific metric.
pub fn barangays_with_metric(registry: &[Barangay], metric: MetricKind) -> Vec<&Barangay> {
    registry.iter().filter(|b| b.metrics.contains(&metric)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
