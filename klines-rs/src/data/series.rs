//! Sorted, timestamp-unique candle series

use crate::data::Candle;

/// Collection of candles, ascending by timestamp with unique timestamps.
///
/// Gaps between candles are allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Create new empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort and deduplicate raw candles, returning the series and the number
    /// of duplicates removed.
    ///
    /// The sort is stable, so for a repeated timestamp the candle that was
    /// appended first (the earliest chunk) is kept.
    pub fn from_unsorted(mut candles: Vec<Candle>) -> (Self, usize) {
        candles.sort_by_key(|c| c.timestamp);
        let before = candles.len();
        candles.dedup_by_key(|c| c.timestamp);
        let removed = before - candles.len();
        (Self { candles }, removed)
    }

    /// Wrap candles already known to be sorted and unique
    pub(crate) fn from_sorted_unchecked(candles: Vec<Candle>) -> Self {
        debug_assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        Self { candles }
    }

    /// Get number of candles
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Check if series is empty
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Get first candle
    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    /// Get last candle
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Get all candles
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Consume the series
    pub fn into_vec(self) -> Vec<Candle> {
        self.candles
    }

    /// Lowest low and highest high
    pub fn price_range(&self) -> Option<(f64, f64)> {
        let first = self.candles.first()?;
        Some(self.candles.iter().fold((first.low, first.high), |(lo, hi), c| {
            (lo.min(c.low), hi.max(c.high))
        }))
    }

    /// Sum of volumes
    pub fn total_volume(&self) -> f64 {
        self.candles.iter().map(|c| c.volume).sum()
    }
}

impl IntoIterator for CandleSeries {
    type Item = Candle;
    type IntoIter = std::vec::IntoIter<Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64) -> Candle {
        Candle::new(ts, close, close, close, close, 1.0)
    }

    #[test]
    fn test_sorts_and_keeps_first_duplicate() {
        // second chunk re-delivers timestamp 120 with a different close
        let raw = vec![candle(60, 1.0), candle(120, 2.0), candle(120, 9.0), candle(0, 0.5)];
        let (series, removed) = CandleSeries::from_unsorted(raw);

        assert_eq!(removed, 1);
        let ts: Vec<i64> = series.candles().iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![0, 60, 120]);
        assert_eq!(series.last().unwrap().close, 2.0);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let raw = vec![candle(0, 1.0), candle(0, 2.0), candle(60, 3.0)];
        let (once, _) = CandleSeries::from_unsorted(raw);
        let (twice, removed) = CandleSeries::from_unsorted(once.clone().into_vec());

        assert_eq!(removed, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_summary_stats() {
        let (series, _) = CandleSeries::from_unsorted(vec![
            Candle::new(0, 10.0, 12.0, 9.0, 11.0, 2.0),
            Candle::new(60, 11.0, 15.0, 10.0, 14.0, 3.0),
        ]);
        assert_eq!(series.price_range(), Some((9.0, 15.0)));
        assert_eq!(series.total_volume(), 5.0);
        assert_eq!(CandleSeries::new().price_range(), None);
    }
}
