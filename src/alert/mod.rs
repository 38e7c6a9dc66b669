//! Risk classification and alert conditions.
//!
//! - `thresholds`: threshold tables and `classify`.
//! - `vocabulary`: canonical scale ↔ prediction / legend labels.
//! - `stalenesses`: flags reports whose latest reading is too old.

pub mod stalenesses;
pub mod thresholds;
pub mod vocabulary;
