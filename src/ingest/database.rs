/// PostgreSQL-backed reading store.
///
/// Reads from `sensor_readings` (see `sql/001_sensor_readings.sql`). The
/// query is bounded by the window; rows come back in no particular
/// order.

use chrono::{DateTime, Utc};
use postgres::{Client, NoTls};

use crate::ingest::{ReadingStore, SeriesKey, StoreError};
use crate::model::{Quality, Sample, Window};

const READINGS_QUERY: &str = "
    SELECT recorded_at, value, quality
    FROM sensor_readings
    WHERE source_id = $1
      AND metric = $2
      AND recorded_at >= $3
      AND recorded_at < $4
";

const SOURCE_EXISTS_QUERY: &str = "
    SELECT EXISTS (SELECT 1 FROM sensor_sources WHERE source_id = $1)
";

pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    pub fn new(client: Client) -> Self {
        PostgresStore { client }
    }

    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let client = Client::connect(database_url, NoTls)?;
        Ok(PostgresStore { client })
    }

    fn source_exists(&mut self, source_id: &str) -> Result<bool, StoreError> {
        let row = self.client.query_one(SOURCE_EXISTS_QUERY, &[&source_id])?;
        Ok(row.get(0))
    }
}

impl ReadingStore for PostgresStore {
    fn fetch_samples(&mut self, key: &SeriesKey, window: &Window) -> Result<Vec<Sample>, StoreError> {
        let rows = self.client.query(
            READINGS_QUERY,
            &[&key.source_id, &key.metric.as_str(), &window.start, &window.end],
        )?;

        if rows.is_empty() && !self.source_exists(&key.source_id)? {
            return Err(StoreError::UnknownSource(key.source_id.clone()));
        }

        let mut samples = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp: DateTime<Utc> = row.try_get(0)?;
            let value: Option<f64> = row.try_get(1)?;
            let quality: Option<String> = row.try_get(2)?;
            samples.push(Sample {
                timestamp,
                value,
                quality: parse_stored_quality(quality.as_deref()),
            });
        }
        Ok(samples)
    }
}

/// Maps the stored quality column onto `Quality`.
///
/// NULL means the row predates quality flags and is treated as `Ok`.
/// Unrecognized flags are treated as `Error` so they never reach the
/// statistics.
pub fn parse_stored_quality(flag: Option<&str>) -> Quality {
    match flag {
        None => Quality::Ok,
        Some(s) => s.parse().unwrap_or(Quality::Error),
    }
}
