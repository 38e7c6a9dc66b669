//! Flood risk core for the barangay flood monitoring dashboard.
//!
//! Reduces stored sensor and environmental readings to windowed statistics
//! and classifies them onto a single ordered risk scale.
//!
//! Data flow: `ingest` (reading store) → `analysis::window` (bounds) →
//! `analysis::aggregate` (statistics) → `alert::thresholds` (risk level) →
//! `service` (JSON-ready reports for the route layer).

pub mod alert;
pub mod analysis;
pub mod barangays;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod service;
