//! Unit tests for klines-rs modules

#[cfg(test)]
mod tests {
    use klines_rs::data::{Candle, CandleSeries, Timeframe};
    use klines_rs::exchange::{normalize_batch, Exchange};
    use klines_rs::fetch::{TimeRange, TimeRangeChunker};
    use klines_rs::resample::{OhlcvAggregator, ResampleTarget};
    use serde_json::json;

    /// Gap-free 1-minute series with a zigzag price path
    fn minute_series(start: i64, count: i64) -> CandleSeries {
        let candles = (0..count)
            .map(|i| {
                let open = 100.0 + (i % 7) as f64 - (i % 3) as f64 * 0.5;
                let close = open + if i % 2 == 0 { 0.8 } else { -0.6 };
                Candle::new(
                    start + i * 60,
                    open,
                    open.max(close) + 0.3,
                    open.min(close) - 0.2,
                    close,
                    1.0 + (i % 5) as f64,
                )
            })
            .collect();
        CandleSeries::from_unsorted(candles).0
    }

    #[test]
    fn test_candle_consistency() {
        let candle = Candle::new(1_701_388_800, 100.0, 110.0, 95.0, 105.0, 1000.0);
        assert!(candle.is_consistent());
        assert_eq!(candle.datetime_string(), "2023-12-01 00:00:00");

        let broken = Candle::new(1_701_388_800, 100.0, 99.0, 95.0, 105.0, 1000.0);
        assert!(!broken.is_consistent());
    }

    #[test]
    fn test_chunks_tile_range() {
        let ranges = [(0, 2500 * 60), (17, 90_061), (1_701_388_800, 1_733_011_200)];
        for (start, end) in ranges {
            for timeframe in [Timeframe::Min1, Timeframe::Min15, Timeframe::Hour4] {
                for limit in [1, 7, 1000] {
                    let range = TimeRange::new(start, end).unwrap();
                    let chunker = TimeRangeChunker::new(range, timeframe, limit).unwrap();
                    let chunks: Vec<_> = chunker.chunks().collect();

                    assert_eq!(chunks.first().unwrap().start, start);
                    assert_eq!(chunks.last().unwrap().end, end);
                    assert!(chunks.windows(2).all(|w| w[0].end == w[1].start));
                    assert!(chunks.iter().all(|c| c.start < c.end));
                    assert_eq!(chunks.len(), chunker.estimated_requests());
                }
            }
        }
    }

    #[test]
    fn test_chunker_scenario_2500_minutes() {
        let range = TimeRange::new(0, 2500 * 60).unwrap();
        let chunker = TimeRangeChunker::new(range, Timeframe::Min1, 1000).unwrap();
        let widths: Vec<i64> = chunker.chunks().map(|c| c.duration() / 60).collect();
        assert_eq!(widths, vec![1000, 1000, 500]);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let series = minute_series(0, 50);
        let mut doubled = series.clone().into_vec();
        doubled.extend(series.clone());

        let (once, removed) = CandleSeries::from_unsorted(doubled);
        assert_eq!(removed, 50);
        assert_eq!(once, series);

        let (twice, removed) = CandleSeries::from_unsorted(once.clone().into_vec());
        assert_eq!(removed, 0);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_aggregate_bucket_invariants() {
        // 2023-12-01 00:00 UTC, three days of minutes
        let base = minute_series(1_701_388_800, 3 * 1440);
        let aggregator = OhlcvAggregator::new(Timeframe::Min1);

        for target in ResampleTarget::defaults() {
            let out = aggregator.aggregate(&base, target.timeframe);
            assert!(!out.is_empty(), "{target}");

            for bucket in out.candles() {
                let end = target.timeframe.bucket_end(bucket.timestamp);
                let members: Vec<&Candle> = base
                    .candles()
                    .iter()
                    .filter(|c| c.timestamp >= bucket.timestamp && c.timestamp < end)
                    .collect();

                assert!(bucket.is_consistent(), "{target} {bucket:?}");
                assert_eq!(bucket.open, members[0].open);
                assert_eq!(bucket.close, members[members.len() - 1].close);
                let high = members.iter().map(|c| c.high).fold(f64::MIN, f64::max);
                let low = members.iter().map(|c| c.low).fold(f64::MAX, f64::min);
                assert_eq!(bucket.high, high);
                assert_eq!(bucket.low, low);
            }
        }
    }

    #[test]
    fn test_aggregate_conserves_volume() {
        let base = minute_series(1_701_388_800, 2 * 1440 + 37);
        let total = base.total_volume();

        for timeframe in [Timeframe::Min5, Timeframe::Hour1, Timeframe::Day1, Timeframe::Month1] {
            let out = OhlcvAggregator::new(Timeframe::Min1).aggregate(&base, timeframe);
            assert!((out.total_volume() - total).abs() < 1e-9, "{timeframe}");
        }
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let base = minute_series(1_701_388_800, 500);
        let aggregator = OhlcvAggregator::new(Timeframe::Min1);
        assert_eq!(
            aggregator.aggregate(&base, Timeframe::Min15),
            aggregator.aggregate(&base, Timeframe::Min15)
        );
    }

    #[test]
    fn test_normalize_mixed_batch() {
        let rows = vec![
            json!([1_701_388_800_000_i64, "1.0", "2.0", "0.5", "1.5", "10", 1_701_388_859_999_i64]),
            json!([1_701_388_860_000_i64, "n/a", "2.0", "0.5", "1.5", "10", 1_701_388_919_999_i64]),
            json!([1_701_388_920_000_i64, "1.5", "2.5", "1.0", "2.0", "12", 1_701_388_979_999_i64]),
        ];
        let batch = normalize_batch(&rows, Exchange::Binance);

        assert_eq!(batch.candles.len(), 2);
        assert_eq!(batch.malformed, 1);
        assert_eq!(batch.next_open, Some(1_701_388_980));
    }
}
