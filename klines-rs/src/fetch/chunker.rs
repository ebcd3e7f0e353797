//! Splitting a time range into exchange-sized request chunks

use crate::data::Timeframe;
use crate::error::KlineError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Half-open time range `[start, end)` in UTC epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    /// Create a range, requiring `start < end`
    pub fn new(start: i64, end: i64) -> Result<Self> {
        if start >= end {
            return Err(KlineError::config(format!(
                "time range start ({start}) must be before end ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Length in seconds
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    /// Whether `ts` lies inside the range
    pub fn contains(&self, ts: i64) -> bool {
        self.start <= ts && ts < self.end
    }
}

/// One bounded request window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position in the fetch
    pub index: usize,
    pub start: i64,
    pub end: i64,
}

impl Chunk {
    /// Length in seconds
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}

/// How the next chunk start is chosen after a response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvancePolicy {
    /// Continue at the end of the requested window
    Fixed,
    /// Continue right after the last candle the exchange returned
    #[default]
    Observed,
}

/// Plans the chunks covering a range for a given candle length and limit
#[derive(Debug, Clone, Copy)]
pub struct TimeRangeChunker {
    range: TimeRange,
    period: i64,
    limit: usize,
}

impl TimeRangeChunker {
    /// Chunker for a fixed-length timeframe
    pub fn new(range: TimeRange, timeframe: Timeframe, limit: usize) -> Result<Self> {
        let period = timeframe.seconds().ok_or_else(|| {
            KlineError::config(format!("timeframe {timeframe} has no fixed candle length"))
        })?;
        Self::with_period(range, period, limit)
    }

    /// Chunker for an explicit candle length in seconds
    pub fn with_period(range: TimeRange, period: i64, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(KlineError::config("limit must be greater than zero"));
        }
        if period <= 0 {
            return Err(KlineError::config("candle period must be positive"));
        }
        Ok(Self {
            range,
            period,
            limit,
        })
    }

    /// Candle length in seconds
    pub fn period(&self) -> i64 {
        self.period
    }

    /// Width of a full chunk: `limit` candles
    pub fn chunk_duration(&self) -> i64 {
        self.limit as i64 * self.period
    }

    /// Number of requests needed when every chunk comes back full
    pub fn estimated_requests(&self) -> usize {
        let width = self.chunk_duration();
        let requests = (self.range.duration() + width - 1) / width;
        requests.max(1) as usize
    }

    /// Fixed-advance chunk sequence. Each call starts over from the range start.
    pub fn chunks(&self) -> Chunks {
        Chunks {
            cursor: self.cursor(),
        }
    }

    /// Cursor for driving the sequence with response feedback
    pub fn cursor(&self) -> ChunkCursor {
        ChunkCursor {
            range: self.range,
            width: self.chunk_duration(),
            next_start: self.range.start,
            index: 0,
        }
    }
}

/// Stateful position in a chunk sequence
#[derive(Debug, Clone)]
pub struct ChunkCursor {
    range: TimeRange,
    width: i64,
    next_start: i64,
    index: usize,
}

impl ChunkCursor {
    /// The chunk to request next, or `None` once the range is covered
    pub fn current(&self) -> Option<Chunk> {
        if self.next_start >= self.range.end {
            return None;
        }
        Some(Chunk {
            index: self.index,
            start: self.next_start,
            end: (self.next_start + self.width).min(self.range.end),
        })
    }

    /// Move past `chunk`.
    ///
    /// `observed_next` is the open time following the last candle actually
    /// received. It is used when it moves forward; otherwise the cursor
    /// continues at the requested chunk end, which also covers empty and
    /// failed chunks.
    pub fn advance(&mut self, chunk: &Chunk, observed_next: Option<i64>) {
        self.next_start = match observed_next {
            Some(next) if next > chunk.start => next,
            _ => chunk.end,
        };
        self.index += 1;
    }

    /// Start of the next chunk
    pub fn position(&self) -> i64 {
        self.next_start
    }
}

/// Iterator over fixed-advance chunks
#[derive(Debug, Clone)]
pub struct Chunks {
    cursor: ChunkCursor,
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let chunk = self.cursor.current()?;
        self.cursor.advance(&chunk, None);
        Some(chunk)
    }
}
