/// In-memory reading store.
///
/// Holds samples exactly as inserted (no sorting, no window filtering) so
/// tests exercise the same unordered input the aggregator must tolerate
/// from real stores.

use std::collections::HashMap;

use crate::ingest::{ReadingStore, SeriesKey, StoreError};
use crate::model::{Sample, Window};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    series: HashMap<SeriesKey, Vec<Sample>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a series with no readings yet.
    pub fn register(&mut self, key: SeriesKey) {
        self.series.entry(key).or_default();
    }

    pub fn insert(&mut self, key: SeriesKey, sample: Sample) {
        self.series.entry(key).or_default().push(sample);
    }

    pub fn len(&self, key: &SeriesKey) -> usize {
        self.series.get(key).map(Vec::len).unwrap_or(0)
    }
}

impl ReadingStore for MemoryStore {
    fn fetch_samples(&mut self, key: &SeriesKey, _window: &Window) -> Result<Vec<Sample>, StoreError> {
        self.series
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::UnknownSource(key.to_string()))
    }
}
