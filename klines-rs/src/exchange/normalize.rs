//! Mapping exchange kline rows onto [`Candle`]
//!
//! Row layouts (positional JSON arrays, prices usually as strings):
//!
//! - Binance: `[open_time_ms, open, high, low, close, volume, close_time_ms, ...]`
//! - Bybit: `[start_time_ms, open, high, low, close, volume, turnover]`

use crate::data::Candle;
use crate::exchange::Exchange;
use serde_json::Value;
use tracing::debug;

/// A decoded row. Fields that failed numeric coercion are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawKline {
    pub open_time_ms: Option<i64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub close_time_ms: Option<i64>,
}

impl RawKline {
    /// Build a candle when every field is present and consistent
    pub fn to_candle(&self) -> Option<Candle> {
        let candle = Candle::new(
            self.open_time_ms?.div_euclid(1000),
            self.open?,
            self.high?,
            self.low?,
            self.close?,
            self.volume?,
        );
        candle.is_consistent().then_some(candle)
    }
}

/// A row accepted by the normalizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRow {
    pub candle: Candle,
    pub close_time_ms: Option<i64>,
}

/// Normalized content of one response
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// Valid candles in response order
    pub candles: Vec<Candle>,
    /// Rows dropped for failed numeric coercion or inconsistent prices
    pub malformed: usize,
    /// Open time following the latest close time seen, in seconds
    pub next_open: Option<i64>,
}

fn number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn millis(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decode a raw row according to the exchange layout
pub fn decode(row: &Value, exchange: Exchange) -> RawKline {
    let field = |i: usize| row.as_array().and_then(|a| a.get(i));
    RawKline {
        open_time_ms: millis(field(0)),
        open: number(field(1)),
        high: number(field(2)),
        low: number(field(3)),
        close: number(field(4)),
        volume: number(field(5)),
        close_time_ms: match exchange {
            Exchange::Binance => millis(field(6)),
            Exchange::Bybit => None,
        },
    }
}

/// Normalize one row, `None` if it is malformed
pub fn normalize(row: &Value, exchange: Exchange) -> Option<NormalizedRow> {
    let raw = decode(row, exchange);
    let candle = raw.to_candle()?;
    Some(NormalizedRow {
        candle,
        close_time_ms: raw.close_time_ms,
    })
}

/// Normalize every row of a response
pub fn normalize_batch(rows: &[Value], exchange: Exchange) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    let mut last_close_ms: Option<i64> = None;

    for row in rows {
        match normalize(row, exchange) {
            Some(normalized) => {
                batch.candles.push(normalized.candle);
                if let Some(close_ms) = normalized.close_time_ms {
                    last_close_ms = Some(last_close_ms.map_or(close_ms, |m| m.max(close_ms)));
                }
            }
            None => {
                debug!("Dropping malformed {} row: {}", exchange.name(), row);
                batch.malformed += 1;
            }
        }
    }

    // Binance close times end 1 ms before the next open
    batch.next_open = last_close_ms.map(|ms| (ms + 999).div_euclid(1000));
    batch
}
