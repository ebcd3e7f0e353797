//! Integration tests for klines-rs

use klines_rs::config::{FetchConfig, RetryPolicy, ResampleConfig};
use klines_rs::data::{load_csv, write_csv, Candle, CandleSeries, Timeframe};
use klines_rs::error::{KlineError, TransportError};
use klines_rs::exchange::{Exchange, Transport};
use klines_rs::fetch::{Fetcher, NoopObserver, TimeRange};
use klines_rs::resample::{resample_file, ResampleTarget};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

/// 2023-12-01 00:00:00 UTC
const DEC_1: i64 = 1_701_388_800;

/// Fresh directory under the system temp dir
fn temp_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let dir = std::env::temp_dir().join(format!(
        "klines-rs-{}-{}-{}",
        name,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Helper function to create consecutive 1-minute candles
fn create_test_candles(start: i64, count: i64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let price = 37_000.0 + (i % 10) as f64 * 1.25;
            Candle::new(start + i * 60, price, price + 5.5, price - 3.25, price + 1.0, 0.125 * (i + 1) as f64)
        })
        .collect()
}

/// Exchange stand-in serving one candle per minute for any window
struct FakeExchange {
    exchange: Exchange,
    stop_after: Option<(usize, watch::Sender<bool>)>,
    calls: Mutex<usize>,
}

impl FakeExchange {
    fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            stop_after: None,
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

fn param(query: &[(&'static str, String)], keys: &[&str]) -> i64 {
    query
        .iter()
        .find(|(k, _)| keys.contains(k))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap()
}

impl Transport for &FakeExchange {
    async fn get_json(
        &self,
        _url: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value, TransportError> {
        let calls = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        if let Some((after, stop)) = &self.stop_after {
            if calls >= *after {
                let _ = stop.send(true);
            }
        }

        let start_ms = param(query, &["startTime", "start"]);
        let end_ms = param(query, &["endTime", "end"]);
        let limit = param(query, &["limit"]) as usize;
        let interval = query
            .iter()
            .find(|(k, _)| *k == "interval")
            .map(|(_, v)| v.as_str())
            .unwrap_or("1m");
        let period_ms = match interval {
            "5m" | "5" => 300_000,
            _ => 60_000,
        };

        let opens = (0..)
            .map(|i| start_ms + i * period_ms)
            .take_while(|open| *open <= end_ms)
            .take(limit);

        match self.exchange {
            Exchange::Binance => {
                let rows: Vec<Value> = opens
                    .map(|open| json!([open, "100.0", "101.0", "99.0", "100.5", "3.0", open + period_ms - 1]))
                    .collect();
                Ok(json!(rows))
            }
            Exchange::Bybit => {
                let mut rows: Vec<Value> = opens
                    .map(|open| json!([open.to_string(), "100.0", "101.0", "99.0", "100.5", "3.0", "300.0"]))
                    .collect();
                rows.reverse();
                Ok(json!({"retCode": 0, "retMsg": "OK", "result": {"category": "spot", "list": rows}}))
            }
        }
    }
}

fn fetch_config(exchange: Exchange, output_dir: PathBuf) -> FetchConfig {
    FetchConfig {
        timeframes: vec![Timeframe::Min1, Timeframe::Min5],
        range: TimeRange::new(DEC_1, DEC_1 + 2500 * 60).unwrap(),
        retry: RetryPolicy::none(),
        output_dir,
        ..FetchConfig::for_exchange(exchange)
    }
}

#[test]
fn test_csv_round_trip() {
    let dir = temp_dir("round-trip");
    let path = dir.join("nested").join("BTCUSDT_1min.csv");
    let (series, _) = CandleSeries::from_unsorted(create_test_candles(DEC_1, 120));

    write_csv(&path, &series).unwrap();
    let loaded = load_csv(&path).unwrap();

    assert_eq!(loaded.series.len(), series.len());
    assert_eq!(loaded.dropped_rows, 0);
    for (a, b) in loaded.series.candles().iter().zip(series.candles()) {
        assert_eq!(a.timestamp, b.timestamp);
        assert!((a.open - b.open).abs() < 1e-9);
        assert!((a.high - b.high).abs() < 1e-9);
        assert!((a.low - b.low).abs() < 1e-9);
        assert!((a.close - b.close).abs() < 1e-9);
        assert!((a.volume - b.volume).abs() < 1e-9);
    }

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Timestamp,Open,High,Low,Close,Volume,Datetime"));
    assert!(lines.next().unwrap().starts_with("1701388800,"));
    assert!(lines.next().unwrap().ends_with(",2023-12-01 00:01:00"));
}

#[test]
fn test_load_rejects_missing_columns() {
    let dir = temp_dir("schema");
    let path = dir.join("bad.csv");
    fs::write(&path, "Timestamp,Open,High,Low,Close,Datetime\n1,1,1,1,1,x\n").unwrap();

    match load_csv(&path) {
        Err(KlineError::SchemaValidation { missing }) => assert_eq!(missing, vec!["Volume"]),
        other => panic!("expected schema failure, got {other:?}"),
    }
}

#[test]
fn test_load_cleans_rows() {
    let dir = temp_dir("hygiene");
    let path = dir.join("messy.csv");
    fs::write(
        &path,
        "Timestamp,Open,High,Low,Close,Volume,Datetime\n\
         1701388860,2,3,1,2.5,10,2023-12-01 00:01:00\n\
         1701389040,1,2,0.5\n\
         1701388800,1,2,0.5,1.5,10,2023-12-01 00:00:00\n\
         1701388860,9,9,9,9,99,2023-12-01 00:01:00\n\
         1701389100,5,4,1,3,10,2023-12-01 00:05:00\n\
         ,3,4,2,3.5,10,2023-12-01 00:02:00\n\
         1701388980,,4,2,3.5,10,2023-12-01 00:03:00\n",
    )
    .unwrap();

    let loaded = load_csv(&path).unwrap();
    let timestamps: Vec<i64> = loaded.series.candles().iter().map(|c| c.timestamp).collect();

    assert_eq!(timestamps, vec![DEC_1, DEC_1 + 60, DEC_1 + 120]);
    assert_eq!(loaded.series.candles()[1].open, 2.0);
    assert_eq!(loaded.duplicates_removed, 1);
    // truncated row, high below open, missing open
    assert_eq!(loaded.dropped_rows, 3);
    assert!(loaded.series.candles().iter().all(Candle::is_consistent));
}

#[test]
fn test_resample_file_writes_every_target() {
    let dir = temp_dir("resample");
    let input = dir.join("BTCUSDT_1min_20231201_to_20231203.csv");
    let (series, _) = CandleSeries::from_unsorted(create_test_candles(DEC_1, 2 * 1440));
    write_csv(&input, &series).unwrap();

    let config = ResampleConfig {
        input: input.clone(),
        output_dir: Some(dir.join("timeframes")),
        ..ResampleConfig::default()
    };
    let summary = resample_file(&config).unwrap();

    assert_eq!(summary.input_rows, 2880);
    assert_eq!(summary.succeeded(), ResampleTarget::defaults().len());
    assert_eq!(summary.failed(), 0);

    let out_dir = dir.join("timeframes");
    let base = "BTCUSDT_20231201_to_20231203";
    let expected_rows = [
        ("1min", 2880),
        ("5min", 576),
        ("1h", 48),
        ("4h", 12),
        ("1d", 2),
        ("1M", 1),
        ("yearly_monthly", 1),
    ];
    for (suffix, rows) in expected_rows {
        let path = out_dir.join(format!("{base}_{suffix}.csv"));
        let loaded = load_csv(&path).unwrap();
        assert_eq!(loaded.series.len(), rows, "{suffix}");
        assert!(
            (loaded.series.total_volume() - series.total_volume()).abs() < 1e-6,
            "{suffix}"
        );
    }

    let daily = load_csv(&out_dir.join(format!("{base}_1d.csv"))).unwrap().series;
    assert_eq!(daily.candles()[0].timestamp, DEC_1);
    assert_eq!(daily.candles()[1].timestamp, DEC_1 + 86_400);
    assert_eq!(daily.candles()[0].close, series.candles()[1439].close);
}

#[tokio::test(start_paused = true)]
async fn test_download_all_binance() {
    let dir = temp_dir("binance");
    let fake = FakeExchange::new(Exchange::Binance);
    let fetcher = Fetcher::new(&fake, fetch_config(Exchange::Binance, dir.clone())).unwrap();

    let summary = fetcher.download_all(&mut NoopObserver).await.unwrap();

    assert_eq!(summary.succeeded(), 2);
    assert!(!summary.interrupted);
    // probe, three 1-minute chunks, one 5-minute chunk
    assert_eq!(fake.calls(), 5);

    let minute = load_csv(&dir.join("BTCUSDT_1min_20231201_to_20231202.csv")).unwrap();
    assert_eq!(minute.series.len(), 2500);
    let five = load_csv(&dir.join("BTCUSDT_5min_20231201_to_20231202.csv")).unwrap();
    assert_eq!(five.series.len(), 500);
}

#[tokio::test(start_paused = true)]
async fn test_download_all_bybit_uses_prefix_and_restores_order() {
    let dir = temp_dir("bybit");
    let fake = FakeExchange::new(Exchange::Bybit);
    let mut config = fetch_config(Exchange::Bybit, dir.clone());
    config.timeframes = vec![Timeframe::Min1];
    let fetcher = Fetcher::new(&fake, config).unwrap();

    let started = tokio::time::Instant::now();
    let summary = fetcher.download_all(&mut NoopObserver).await.unwrap();

    assert_eq!(summary.succeeded(), 1);
    // two 2-second pauses between the three chunk requests
    assert_eq!(started.elapsed(), Duration::from_secs(4));

    let loaded = load_csv(&dir.join("bybit_BTCUSDT_1min_20231201_to_20231202.csv")).unwrap();
    assert_eq!(loaded.series.len(), 2500);
    assert_eq!(loaded.series.first().unwrap().timestamp, DEC_1);
    assert_eq!(loaded.series.last().unwrap().timestamp, DEC_1 + 2499 * 60);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_flushes_partial_data() {
    let dir = temp_dir("interrupt");
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut fake = FakeExchange::new(Exchange::Binance);
    // the probe is call 1, the first 1-minute chunk is call 2
    fake.stop_after = Some((2, stop_tx));
    let fetcher = Fetcher::new(&fake, fetch_config(Exchange::Binance, dir.clone()))
        .unwrap()
        .with_stop_signal(stop_rx);

    let summary = fetcher.download_all(&mut NoopObserver).await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.reports.len(), 1);
    assert!(summary.reports[0].interrupted);
    assert_eq!(summary.written.len(), 1);
    assert_eq!(fake.calls(), 2);

    let partial = load_csv(&summary.written[0].1).unwrap();
    assert_eq!(partial.series.len(), 1000);
    assert!(!dir.join("BTCUSDT_5min_20231201_to_20231202.csv").exists());
}
