//! Candle timeframes and their bucket boundaries

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KlineError;

/// Candle timeframe.
///
/// Minute-based timeframes have a fixed length and can be fetched from an
/// exchange. `Month1` and `Year1` follow the calendar and are only produced
/// by resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Min1,
    Min5,
    Min15,
    Min30,
    Hour1,
    Hour4,
    Hour6,
    Hour12,
    Day1,
    Month1,
    Year1,
}

impl Timeframe {
    /// Timeframes that can be requested from an exchange, finest first
    pub const FETCHABLE: [Timeframe; 9] = [
        Timeframe::Min1,
        Timeframe::Min5,
        Timeframe::Min15,
        Timeframe::Min30,
        Timeframe::Hour1,
        Timeframe::Hour4,
        Timeframe::Hour6,
        Timeframe::Hour12,
        Timeframe::Day1,
    ];

    /// Short label used in file names and logs (e.g. "5min", "1h", "1M")
    pub fn label(&self) -> &'static str {
        match self {
            Self::Min1 => "1min",
            Self::Min5 => "5min",
            Self::Min15 => "15min",
            Self::Min30 => "30min",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Hour6 => "6h",
            Self::Hour12 => "12h",
            Self::Day1 => "1d",
            Self::Month1 => "1M",
            Self::Year1 => "1Y",
        }
    }

    /// Candle length in minutes, `None` for calendar timeframes
    pub fn minutes(&self) -> Option<i64> {
        match self {
            Self::Min1 => Some(1),
            Self::Min5 => Some(5),
            Self::Min15 => Some(15),
            Self::Min30 => Some(30),
            Self::Hour1 => Some(60),
            Self::Hour4 => Some(240),
            Self::Hour6 => Some(360),
            Self::Hour12 => Some(720),
            Self::Day1 => Some(1440),
            Self::Month1 | Self::Year1 => None,
        }
    }

    /// Candle length in seconds, `None` for calendar timeframes
    pub fn seconds(&self) -> Option<i64> {
        self.minutes().map(|m| m * 60)
    }

    /// Whether the candle length is fixed
    pub fn is_fixed(&self) -> bool {
        self.minutes().is_some()
    }

    /// Start of the bucket containing `ts` (epoch seconds, UTC).
    ///
    /// Fixed timeframes align to multiples of their length since the epoch,
    /// which puts hours on the top of the hour and days on UTC midnight.
    /// Months start on the first, years on January 1st.
    pub fn bucket_start(&self, ts: i64) -> i64 {
        if let Some(secs) = self.seconds() {
            return ts - ts.rem_euclid(secs);
        }

        let Some(dt) = DateTime::<Utc>::from_timestamp(ts, 0) else {
            return ts;
        };
        let month = match self {
            Self::Year1 => 1,
            _ => dt.month(),
        };
        NaiveDate::from_ymd_opt(dt.year(), month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc().timestamp())
            .unwrap_or(ts)
    }

    /// Exclusive end of the bucket starting at `bucket_start`
    pub fn bucket_end(&self, bucket_start: i64) -> i64 {
        if let Some(secs) = self.seconds() {
            return bucket_start + secs;
        }

        let Some(dt) = DateTime::<Utc>::from_timestamp(bucket_start, 0) else {
            return bucket_start;
        };
        let (year, month) = match self {
            Self::Year1 => (dt.year() + 1, 1),
            _ if dt.month() == 12 => (dt.year() + 1, 1),
            _ => (dt.year(), dt.month() + 1),
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc().timestamp())
            .unwrap_or(bucket_start)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = KlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1min" | "1m" => Ok(Self::Min1),
            "5min" | "5m" => Ok(Self::Min5),
            "15min" | "15m" => Ok(Self::Min15),
            "30min" | "30m" => Ok(Self::Min30),
            "1h" => Ok(Self::Hour1),
            "4h" => Ok(Self::Hour4),
            "6h" => Ok(Self::Hour6),
            "12h" => Ok(Self::Hour12),
            "1d" => Ok(Self::Day1),
            "1M" => Ok(Self::Month1),
            "1Y" => Ok(Self::Year1),
            other => Err(KlineError::config(format!("unknown timeframe: {other}"))),
        }
    }
}
