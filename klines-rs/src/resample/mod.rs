//! Resampling of base candles into coarser timeframes

pub mod aggregator;
pub mod pipeline;

pub use aggregator::*;
pub use pipeline::*;
