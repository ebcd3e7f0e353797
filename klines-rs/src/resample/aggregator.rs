//! OHLCV aggregation into coarser timeframes

use crate::data::{Candle, CandleSeries, Timeframe};
use crate::error::KlineError;
use std::fmt;
use std::str::FromStr;

/// Name of the monthly target that summarizes a year of data
pub const YEARLY_MONTHLY: &str = "1Y_monthly";

/// A named resample output.
///
/// The name only affects labeling; `1Y_monthly` and `1M` aggregate
/// identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResampleTarget {
    pub name: String,
    pub timeframe: Timeframe,
}

impl ResampleTarget {
    /// Target named after its timeframe
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            name: timeframe.label().to_string(),
            timeframe,
        }
    }

    /// Monthly buckets labelled as a yearly summary
    pub fn yearly_monthly() -> Self {
        Self {
            name: YEARLY_MONTHLY.to_string(),
            timeframe: Timeframe::Month1,
        }
    }

    /// `1min` through `1d`, then `1M` and `1Y_monthly`
    pub fn defaults() -> Vec<Self> {
        Timeframe::FETCHABLE
            .iter()
            .copied()
            .chain([Timeframe::Month1])
            .map(Self::new)
            .chain([Self::yearly_monthly()])
            .collect()
    }

    /// Suffix used in the output file name
    pub fn file_suffix(&self) -> &str {
        if self.name == YEARLY_MONTHLY {
            "yearly_monthly"
        } else {
            &self.name
        }
    }
}

impl fmt::Display for ResampleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for ResampleTarget {
    type Err = KlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == YEARLY_MONTHLY {
            return Ok(Self::yearly_monthly());
        }
        s.parse().map(Self::new)
    }
}

/// Aggregates a base series into coarser buckets
#[derive(Debug, Clone, Copy)]
pub struct OhlcvAggregator {
    base: Timeframe,
}

impl OhlcvAggregator {
    /// Aggregator for input series of granularity `base`
    pub fn new(base: Timeframe) -> Self {
        Self { base }
    }

    /// Granularity of the input
    pub fn base(&self) -> Timeframe {
        self.base
    }

    /// Resample `series` into `target` buckets.
    ///
    /// Targeting the base timeframe returns the series unchanged. Otherwise
    /// each output candle is stamped with its bucket start and takes the
    /// first open, highest high, lowest low, last close and summed volume of
    /// the candles falling in `[bucket_start, bucket_end)`. Buckets without
    /// candles produce no row.
    pub fn aggregate(&self, series: &CandleSeries, target: Timeframe) -> CandleSeries {
        if target == self.base {
            return series.clone();
        }
        resample(series, target)
    }
}

/// Bucket aggregation of a sorted series
pub fn resample(series: &CandleSeries, target: Timeframe) -> CandleSeries {
    let mut out: Vec<Candle> = Vec::new();
    let mut current: Option<Candle> = None;

    for candle in series.candles() {
        let bucket = target.bucket_start(candle.timestamp);
        match current.as_mut() {
            Some(acc) if acc.timestamp == bucket => {
                acc.high = acc.high.max(candle.high);
                acc.low = acc.low.min(candle.low);
                acc.close = candle.close;
                acc.volume += candle.volume;
            }
            _ => {
                out.extend(current.take());
                current = Some(Candle { timestamp: bucket, ..*candle });
            }
        }
    }
    out.extend(current);

    CandleSeries::from_sorted_unchecked(out)
}
