//! OHLCV candle data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Human-readable UTC layout used for the `Datetime` CSV column
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// OHLCV candle data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time, UTC epoch seconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

impl Candle {
    /// Create a new candle
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Open time as a UTC datetime
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0)
    }

    /// Open time rendered with [`DATETIME_FORMAT`]
    pub fn datetime_string(&self) -> String {
        self.datetime()
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
            .unwrap_or_default()
    }

    /// Check `low <= open, close <= high` with finite values
    pub fn is_consistent(&self) -> bool {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        fields.iter().all(|v| v.is_finite())
            && self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_string() {
        let candle = Candle::new(1_701_388_800, 1.0, 2.0, 0.5, 1.5, 10.0);
        assert_eq!(candle.datetime_string(), "2023-12-01 00:00:00");
    }

    #[test]
    fn test_consistency() {
        assert!(Candle::new(0, 100.0, 110.0, 95.0, 105.0, 1.0).is_consistent());
        assert!(!Candle::new(0, 100.0, 99.0, 95.0, 105.0, 1.0).is_consistent());
        assert!(!Candle::new(0, 100.0, 110.0, 101.0, 105.0, 1.0).is_consistent());
        assert!(!Candle::new(0, f64::NAN, 110.0, 95.0, 105.0, 1.0).is_consistent());
    }
}
