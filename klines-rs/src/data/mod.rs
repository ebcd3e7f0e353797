//! Data management module
//!
//! Candle types, the deduplicated series, timeframes and CSV storage.

pub mod candle;
pub mod series;
pub mod storage;
pub mod timeframe;

pub use candle::*;
pub use series::*;
pub use storage::*;
pub use timeframe::*;
