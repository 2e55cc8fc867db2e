//! Common types used throughout the pipeline
//!
//! Flattened record types for the two datasets, the run date stamp,
//! and small shared enums.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Dataset Names
// ============================================================================

/// Dataset / table name for the filtered network catalog
pub const NETWORKS_DATASET: &str = "networks";

/// Dataset / table name for the combined station snapshots
pub const STATIONS_DATASET: &str = "bike_station_data";

/// Default upstream API root
pub const DEFAULT_BASE_URL: &str = "http://api.citybik.es/v2";

/// Default country filter for the catalog
pub const DEFAULT_COUNTRY: &str = "US";

/// Default local directory for materialized files
pub const DEFAULT_DATA_DIR: &str = "citybike_data";

// ============================================================================
// Records
// ============================================================================

/// One row of the `networks` dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub network_id: String,
    pub network_name: String,
    pub company: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One row of the `bike_station_data` dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSnapshot {
    pub network_id: String,
    pub station_id: String,
    pub station_name: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub free_bikes: Option<i64>,
    pub empty_slots: Option<i64>,
}

// ============================================================================
// Run
// ============================================================================

/// The date a run is identified by
///
/// Runs have no identity beyond the date stamp embedded in output file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDate(NaiveDate);

impl RunDate {
    /// Today, in local time
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// A fixed date (tests, backfills)
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The underlying date
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// `YYYYMMDD` stamp
    pub fn stamp(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// File name for a dataset: `<dataset>_<YYYYMMDD>.parquet`
    pub fn file_name(&self, dataset: &str) -> String {
        format!("{dataset}_{}.parquet", self.stamp())
    }
}

impl Default for RunDate {
    fn default() -> Self {
        Self::today()
    }
}

impl std::fmt::Display for RunDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Backoff strategy for HTTP retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(NETWORKS_DATASET, 2024, 9, 25, "networks_20240925.parquet" ; "networks")]
    #[test_case(STATIONS_DATASET, 2026, 1, 3, "bike_station_data_20260103.parquet" ; "stations")]
    fn test_run_date_file_name(dataset: &str, y: i32, m: u32, d: u32, expected: &str) {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(RunDate::from_date(date).file_name(dataset), expected);
    }

    #[test]
    fn test_run_date_stamp() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let run = RunDate::from_date(date);
        assert_eq!(run.stamp(), "20261019");
        assert_eq!(run.to_string(), "2026-10-19");
    }

    #[test]
    fn test_backoff_type_serde() {
        let backoff: BackoffType = serde_json::from_str("\"linear\"").unwrap();
        assert_eq!(backoff, BackoffType::Linear);
        assert_eq!(BackoffType::default(), BackoffType::Exponential);
    }
}
