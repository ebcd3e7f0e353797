//! Klines-RS: historical OHLCV candle downloader and resampler
//!
//! Fetches klines from exchange REST APIs in limit-sized chunks, normalizes
//! the exchange row layouts into [`data::Candle`]s, persists them as CSV and
//! derives coarser timeframes from a base series.
//!
//! # Features
//!
//! - **Fetching**: chunked, sequential requests with retry and backoff
//! - **Exchanges**: Binance USDⓈ-M futures and Bybit spot
//! - **Resampling**: calendar-aware OHLCV aggregation up to monthly buckets
//! - **Storage**: `Timestamp,Open,High,Low,Close,Volume,Datetime` CSV files
//!
//! # Example
//!
//! ```no_run
//! use klines_rs::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let fetcher = Fetcher::connect(FetchConfig::default())?;
//!     let summary = fetcher.download_all(&mut TracingObserver).await?;
//!     println!("{}", summary.format());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod exchange;
pub mod fetch;
pub mod resample;

// Re-export commonly used types
pub mod prelude {
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::error::{KlineError, TransportError};
    pub use crate::exchange::*;
    pub use crate::fetch::*;
    pub use crate::resample::*;
    pub use crate::Result;
}

pub use error::{KlineError, TransportError};

/// Result type alias
pub type Result<T, E = KlineError> = std::result::Result<T, E>;
