//! Supported exchanges and their REST kline endpoints

use crate::data::Timeframe;
use crate::error::KlineError;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use super::requester::{FetchRequest, KlineResponse};

/// Supported exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// Binance USDⓈ-M futures, `/fapi/v1/klines`
    Binance,
    /// Bybit v5 spot, `/v5/market/kline`
    Bybit,
}

impl Exchange {
    /// Lower-case exchange name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Bybit => "bybit",
        }
    }

    /// Default REST base URL
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Binance => "https://fapi.binance.com",
            Self::Bybit => "https://api.bybit.com",
        }
    }

    /// Kline endpoint path
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Binance => "/fapi/v1/klines",
            Self::Bybit => "/v5/market/kline",
        }
    }

    /// Largest `limit` accepted by a single request
    pub fn max_limit(&self) -> usize {
        match self {
            Self::Binance => 1500,
            Self::Bybit => 1000,
        }
    }

    /// Whether rows carry a close time usable for observed advance
    pub fn has_close_time(&self) -> bool {
        matches!(self, Self::Binance)
    }

    /// Prefix for output file names
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Self::Binance => "",
            Self::Bybit => "bybit_",
        }
    }

    /// Exchange interval code for a timeframe
    pub fn interval_code(&self, timeframe: Timeframe) -> Option<&'static str> {
        use Timeframe::*;
        let code = match (self, timeframe) {
            (_, Month1 | Year1) => return None,
            (Self::Binance, Min1) => "1m",
            (Self::Binance, Min5) => "5m",
            (Self::Binance, Min15) => "15m",
            (Self::Binance, Min30) => "30m",
            (Self::Binance, Hour1) => "1h",
            (Self::Binance, Hour4) => "4h",
            (Self::Binance, Hour6) => "6h",
            (Self::Binance, Hour12) => "12h",
            (Self::Binance, Day1) => "1d",
            (Self::Bybit, Min1) => "1",
            (Self::Bybit, Min5) => "5",
            (Self::Bybit, Min15) => "15",
            (Self::Bybit, Min30) => "30",
            (Self::Bybit, Hour1) => "60",
            (Self::Bybit, Hour4) => "240",
            (Self::Bybit, Hour6) => "360",
            (Self::Bybit, Hour12) => "720",
            (Self::Bybit, Day1) => "D",
        };
        Some(code)
    }

    /// Query parameters for one request. Both exchanges take milliseconds
    /// and treat the end as inclusive, so the half-open window ends 1 ms early.
    pub fn query(&self, request: &FetchRequest) -> Result<Vec<(&'static str, String)>> {
        let interval = self.interval_code(request.timeframe).ok_or_else(|| {
            KlineError::config(format!(
                "{} has no interval code for {}",
                self.name(),
                request.timeframe
            ))
        })?;
        if request.limit == 0 || request.limit > self.max_limit() {
            return Err(KlineError::config(format!(
                "limit {} outside 1..={} for {}",
                request.limit,
                self.max_limit(),
                self.name()
            )));
        }

        let start_ms = request.range.start * 1000;
        let end_ms = request.range.end * 1000 - 1;
        let params = match self {
            Self::Binance => vec![
                ("symbol", request.symbol.clone()),
                ("interval", interval.to_string()),
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", request.limit.to_string()),
            ],
            Self::Bybit => vec![
                ("category", "spot".to_string()),
                ("symbol", request.symbol.clone()),
                ("interval", interval.to_string()),
                ("start", start_ms.to_string()),
                ("end", end_ms.to_string()),
                ("limit", request.limit.to_string()),
            ],
        };
        Ok(params)
    }

    /// Classify a successfully received payload as rows or "no data"
    pub fn interpret(&self, payload: Value) -> KlineResponse {
        match self {
            Self::Binance => match payload {
                Value::Array(rows) if !rows.is_empty() => KlineResponse::Rows(rows),
                Value::Array(_) => KlineResponse::no_data("empty kline list"),
                Value::Object(obj) => KlineResponse::no_data(
                    obj.get("msg")
                        .and_then(Value::as_str)
                        .unwrap_or("unexpected object payload"),
                ),
                _ => KlineResponse::no_data("unexpected payload"),
            },
            Self::Bybit => {
                let ret_code = payload.get("retCode").and_then(Value::as_i64);
                let ret_msg = payload
                    .get("retMsg")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error")
                    .to_string();
                let list = payload
                    .get("result")
                    .and_then(|r| r.get("list"))
                    .and_then(Value::as_array);

                match (ret_code, list) {
                    (Some(0), Some(rows)) if !rows.is_empty() => KlineResponse::Rows(rows.clone()),
                    (Some(0), _) => KlineResponse::no_data("empty kline list"),
                    _ => KlineResponse::no_data(ret_msg),
                }
            }
        }
    }
}

impl FromStr for Exchange {
    type Err = KlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binance" | "binance_futures" | "binance_usdm" => Ok(Self::Binance),
            "bybit" | "bybit_spot" => Ok(Self::Bybit),
            other => Err(KlineError::config(format!("unsupported exchange: {other}"))),
        }
    }
}
