//! Fetch pipeline configuration

use crate::config::{env_or, env_var, Backoff, RetryPolicy};
use crate::data::Timeframe;
use crate::error::KlineError;
use crate::exchange::Exchange;
use crate::fetch::{AdvancePolicy, TimeRange};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// What to do with a chunk whose request exhausted its retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Count the chunk as failed and continue with the next one
    #[default]
    SkipChunk,
    /// Stop fetching the current timeframe, keeping what was already fetched
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = KlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" | "skip_chunk" => Ok(Self::SkipChunk),
            "abort" => Ok(Self::Abort),
            other => Err(KlineError::config(format!("unknown failure policy: {other}"))),
        }
    }
}

impl FromStr for AdvancePolicy {
    type Err = KlineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "observed" => Ok(Self::Observed),
            other => Err(KlineError::config(format!("unknown advance policy: {other}"))),
        }
    }
}

/// Fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Trading pair as the exchange spells it (e.g. "BTCUSDT")
    pub symbol: String,
    pub exchange: Exchange,
    /// Overrides the exchange's default REST base URL
    pub base_url: Option<String>,
    /// Timeframes to download, in order
    pub timeframes: Vec<Timeframe>,
    pub range: TimeRange,
    /// Candles per request
    pub limit: usize,
    /// Pause between successive requests
    pub request_delay: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    pub advance: AdvancePolicy,
    pub on_failure: FailurePolicy,
    pub retry: RetryPolicy,
    /// Directory receiving the CSV files
    pub output_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::for_exchange(Exchange::Binance)
    }
}

impl FetchConfig {
    /// Defaults for an exchange: one year of BTCUSDT from 2023-12-01
    pub fn for_exchange(exchange: Exchange) -> Self {
        let request_delay = match exchange {
            Exchange::Binance => Duration::from_millis(100),
            Exchange::Bybit => Duration::from_secs(2),
        };
        Self {
            symbol: "BTCUSDT".to_string(),
            exchange,
            base_url: None,
            timeframes: Timeframe::FETCHABLE.to_vec(),
            range: TimeRange {
                start: 1_701_388_800,
                end: 1_733_011_200,
            },
            limit: 1000,
            request_delay,
            request_timeout: Duration::from_secs(60),
            advance: AdvancePolicy::default(),
            on_failure: FailurePolicy::default(),
            retry: RetryPolicy::default(),
            output_dir: PathBuf::from("crypto_data"),
        }
    }

    /// Load from `KLINES_*` environment variables (and `.env`), falling back
    /// to [`FetchConfig::for_exchange`] defaults
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let exchange: Exchange = env_or("KLINES_EXCHANGE", Exchange::Binance)?;
        let defaults = Self::for_exchange(exchange);

        let timeframes = match env_var("KLINES_TIMEFRAMES") {
            Some(list) => list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(Timeframe::from_str)
                .collect::<Result<Vec<_>>>()?,
            None => defaults.timeframes.clone(),
        };

        let backoff = match env_var("KLINES_BACKOFF_SECS") {
            Some(secs) => Backoff::Linear {
                step: Duration::from_secs(secs.trim().parse().map_err(|_| {
                    KlineError::config(format!("KLINES_BACKOFF_SECS is not a number: {secs}"))
                })?),
            },
            None => defaults.retry.backoff,
        };

        let config = Self {
            symbol: env_var("KLINES_SYMBOL").unwrap_or(defaults.symbol),
            exchange,
            base_url: env_var("KLINES_BASE_URL"),
            timeframes,
            range: TimeRange::new(
                env_or("KLINES_START", defaults.range.start)?,
                env_or("KLINES_END", defaults.range.end)?,
            )?,
            limit: env_or("KLINES_LIMIT", defaults.limit)?,
            request_delay: Duration::from_millis(env_or(
                "KLINES_DELAY_MS",
                defaults.request_delay.as_millis() as u64,
            )?),
            request_timeout: Duration::from_secs(env_or(
                "KLINES_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            advance: env_or("KLINES_ADVANCE", defaults.advance)?,
            on_failure: env_or("KLINES_ON_FAILURE", defaults.on_failure)?,
            retry: RetryPolicy {
                max_attempts: env_or("KLINES_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
                backoff,
            },
            output_dir: env_var("KLINES_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration before any request is made
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(KlineError::config("symbol must not be empty"));
        }
        TimeRange::new(self.range.start, self.range.end)?;

        let max = self.exchange.max_limit();
        if self.limit == 0 || self.limit > max {
            return Err(KlineError::config(format!(
                "limit {} outside 1..={} for {}",
                self.limit,
                max,
                self.exchange.name()
            )));
        }
        if self.timeframes.is_empty() {
            return Err(KlineError::config("no timeframes configured"));
        }
        if let Some(tf) = self
            .timeframes
            .iter()
            .find(|tf| self.exchange.interval_code(**tf).is_none())
        {
            return Err(KlineError::config(format!(
                "{} cannot be fetched from {}",
                tf,
                self.exchange.name()
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(KlineError::config("max_attempts must be at least 1"));
        }
        Ok(())
    }

    /// Advance policy usable with this exchange's row layout
    pub fn effective_advance(&self) -> AdvancePolicy {
        if self.exchange.has_close_time() {
            self.advance
        } else {
            AdvancePolicy::Fixed
        }
    }
}
