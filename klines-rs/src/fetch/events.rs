//! Progress events emitted by the fetch pipeline

use crate::data::Timeframe;
use crate::error::KlineError;
use crate::fetch::{Chunk, FetchReport};
use tracing::{debug, info, warn};

/// Receives progress of a fetch.
///
/// Every method has a no-op default, so a sink only implements what it
/// presents.
pub trait FetchObserver {
    /// A timeframe fetch is about to start
    fn on_timeframe_started(&mut self, _timeframe: Timeframe, _estimated_requests: usize) {}

    /// A chunk returned at least one valid candle
    fn on_chunk_fetched(&mut self, _timeframe: Timeframe, _chunk: &Chunk, _candles: usize) {}

    /// A chunk was answered but held no usable candles
    fn on_chunk_empty(&mut self, _timeframe: Timeframe, _chunk: &Chunk, _reason: &str) {}

    /// A chunk failed after the retry policy gave up
    fn on_chunk_failed(&mut self, _timeframe: Timeframe, _chunk: &Chunk, _error: &KlineError) {}

    /// A timeframe fetch finished, was aborted or was interrupted
    fn on_complete(&mut self, _report: &FetchReport) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {}

/// Observer that logs through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_timeframe_started(&mut self, timeframe: Timeframe, estimated_requests: usize) {
        info!("Fetching {} candles, about {} requests", timeframe, estimated_requests);
    }

    fn on_chunk_fetched(&mut self, timeframe: Timeframe, chunk: &Chunk, candles: usize) {
        info!(
            "{} chunk {}: {} candles from {}",
            timeframe,
            chunk.index + 1,
            candles,
            chunk.start
        );
    }

    fn on_chunk_empty(&mut self, timeframe: Timeframe, chunk: &Chunk, reason: &str) {
        debug!(
            "{} chunk {} [{}, {}) empty: {}",
            timeframe,
            chunk.index + 1,
            chunk.start,
            chunk.end,
            reason
        );
    }

    fn on_chunk_failed(&mut self, timeframe: Timeframe, chunk: &Chunk, error: &KlineError) {
        warn!(
            "{} chunk {} [{}, {}) failed: {}",
            timeframe,
            chunk.index + 1,
            chunk.start,
            chunk.end,
            error
        );
    }

    fn on_complete(&mut self, report: &FetchReport) {
        if report.interrupted {
            warn!("{} fetch interrupted with {} candles", report.timeframe, report.candles);
        } else {
            info!(
                "{} fetch done: {} candles, {} failed chunks",
                report.timeframe, report.candles, report.failed_chunks
            );
        }
    }
}
