//! CSV persistence of candle series
//!
//! Files carry the header `Timestamp,Open,High,Low,Close,Volume,Datetime`
//! and are the hand-off between the fetch and resample pipelines.

use crate::data::{Candle, CandleSeries, DATETIME_FORMAT};
use crate::error::KlineError;
use crate::fetch::TimeRange;
use crate::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Columns every candle CSV must have
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Timestamp", "Open", "High", "Low", "Close", "Volume", "Datetime",
];

/// One CSV row
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Timestamp")]
    timestamp: i64,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
    #[serde(rename = "Datetime")]
    datetime: String,
}

impl From<&Candle> for CsvRow {
    fn from(c: &Candle) -> Self {
        Self {
            timestamp: c.timestamp,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            datetime: c.datetime_string(),
        }
    }
}

/// Result of loading a CSV file
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: CandleSeries,
    /// Rows dropped because a value was missing, not numeric or the prices
    /// were inconsistent
    pub dropped_rows: usize,
    /// Rows dropped because their timestamp was already present
    pub duplicates_removed: usize,
}

/// Parse a `Datetime` cell back to epoch seconds
pub fn parse_datetime(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
        return Some(dt.and_utc().timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp())
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| parse_number(s).map(|v| v as i64))
}

/// Write a series to `path`, creating parent directories as needed
pub fn write_csv(path: &Path, series: &CandleSeries) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    if series.is_empty() {
        writer.write_record(REQUIRED_COLUMNS)?;
    }
    for candle in series.candles() {
        writer.serialize(CsvRow::from(candle))?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", series.len(), path.display());
    Ok(())
}

/// Load a candle CSV.
///
/// Fails with [`KlineError::SchemaValidation`] when a required column is
/// missing. Short rows, rows with unparseable values and rows breaking
/// `low <= open, close <= high` are dropped; the result is sorted and
/// deduplicated.
pub fn load_csv(path: &Path) -> Result<LoadedSeries> {
    // short rows (e.g. a truncated last line) are dropped below, not fatal
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|&&name| position(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(KlineError::SchemaValidation { missing });
    }

    let col = |name: &str| position(name).unwrap_or_default();
    let (ts_col, dt_col) = (col("Timestamp"), col("Datetime"));
    let value_cols = [col("Open"), col("High"), col("Low"), col("Close"), col("Volume")];

    let mut candles = Vec::new();
    let mut dropped_rows = 0;
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("");

        let timestamp = parse_timestamp(field(ts_col)).or_else(|| parse_datetime(field(dt_col)));
        let values: Option<Vec<f64>> = value_cols.iter().map(|&i| parse_number(field(i))).collect();

        match (timestamp, values) {
            (Some(ts), Some(v)) => {
                let candle = Candle::new(ts, v[0], v[1], v[2], v[3], v[4]);
                if candle.is_consistent() {
                    candles.push(candle);
                } else {
                    dropped_rows += 1;
                }
            }
            _ => dropped_rows += 1,
        }
    }

    if dropped_rows > 0 {
        warn!("Removed {} rows with missing data from {}", dropped_rows, path.display());
    }

    let (series, duplicates_removed) = CandleSeries::from_unsorted(candles);
    info!("Loaded {} records from {}", series.len(), path.display());

    Ok(LoadedSeries {
        series,
        dropped_rows,
        duplicates_removed,
    })
}

/// `{prefix}{symbol}_{label}_{YYYYMMDD}_to_{YYYYMMDD}.csv`
pub fn series_filename(prefix: &str, symbol: &str, label: &str, range: &TimeRange) -> String {
    let date = |ts: i64| {
        DateTime::<Utc>::from_timestamp(ts, 0)
            .map(|dt| dt.format("%Y%m%d").to_string())
            .unwrap_or_else(|| ts.to_string())
    };
    format!(
        "{}{}_{}_{}_to_{}.csv",
        prefix,
        symbol,
        label,
        date(range.start),
        date(range.end)
    )
}

/// Directory-backed CSV storage
#[derive(Debug, Clone)]
pub struct CsvStorage {
    dir: PathBuf,
}

impl CsvStorage {
    /// Create storage rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a file in the storage directory
    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Write a series under `filename`, returning its path
    pub fn save(&self, filename: &str, series: &CandleSeries) -> Result<PathBuf> {
        let path = self.path_for(filename);
        write_csv(&path, series)?;
        Ok(path)
    }
}
