//! Windowing and aggregation of stored readings.
//!
//! Everything here is a pure function over in-memory samples; fetching
//! them is the job of `ingest`, classifying the result is the job of
//! `alert`.
//!
//! Submodules:
//! - `window`: turns a period token or explicit bounds into a `Window`.
//! - `aggregate`: reduces samples inside a window to `Statistics`.
//! - `series`: per-bucket statistics for charts.

pub mod aggregate;
pub mod series;
pub mod window;
