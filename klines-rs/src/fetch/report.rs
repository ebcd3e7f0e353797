//! Fetch reports

use crate::data::{CandleSeries, Timeframe};
use std::path::PathBuf;

/// Counters of one timeframe fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    pub symbol: String,
    pub exchange: String,
    pub timeframe: Timeframe,
    pub estimated_requests: usize,
    /// Chunks that returned candles
    pub chunks_ok: usize,
    /// Chunks answered with no usable candles
    pub empty_chunks: usize,
    /// Chunks whose retries were exhausted
    pub failed_chunks: usize,
    /// Rows dropped by the normalizer
    pub malformed_rows: usize,
    pub duplicates_removed: usize,
    /// Candles in the final series
    pub candles: usize,
    /// Stopped by the failure policy
    pub aborted: bool,
    /// Stopped by an external interrupt
    pub interrupted: bool,
}

impl FetchReport {
    pub(crate) fn new(
        symbol: &str,
        exchange: &str,
        timeframe: Timeframe,
        estimated_requests: usize,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            timeframe,
            estimated_requests,
            chunks_ok: 0,
            empty_chunks: 0,
            failed_chunks: 0,
            malformed_rows: 0,
            duplicates_removed: 0,
            candles: 0,
            aborted: false,
            interrupted: false,
        }
    }

    /// Requests actually made
    pub fn requests(&self) -> usize {
        self.chunks_ok + self.empty_chunks + self.failed_chunks
    }

    /// Whether every chunk of the range was fetched
    pub fn is_complete(&self) -> bool {
        self.failed_chunks == 0 && !self.aborted && !self.interrupted
    }

    /// Format report as string
    pub fn format(&self) -> String {
        let status = if self.interrupted {
            "interrupted"
        } else if self.aborted {
            "aborted"
        } else if self.failed_chunks > 0 {
            "partial"
        } else {
            "complete"
        };
        format!(
            r#"
{} {} {} ({})
================
Requests: {} (estimated {})
Chunks OK: {}
Empty Chunks: {}
Failed Chunks: {}
Malformed Rows: {}
Duplicates Removed: {}
Candles: {}
"#,
            self.exchange,
            self.symbol,
            self.timeframe,
            status,
            self.requests(),
            self.estimated_requests,
            self.chunks_ok,
            self.empty_chunks,
            self.failed_chunks,
            self.malformed_rows,
            self.duplicates_removed,
            self.candles,
        )
    }
}

/// Series of one timeframe with its report
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub series: CandleSeries,
    pub report: FetchReport,
}

/// Result of a multi-timeframe download
#[derive(Debug, Clone, Default)]
pub struct DownloadSummary {
    pub reports: Vec<FetchReport>,
    /// CSV files written, in timeframe order
    pub written: Vec<(Timeframe, PathBuf)>,
    /// An interrupt ended the download early
    pub interrupted: bool,
}

impl DownloadSummary {
    /// Timeframes fetched completely and written
    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.is_complete() && r.candles > 0)
            .filter(|r| self.written.iter().any(|(tf, _)| *tf == r.timeframe))
            .count()
    }

    /// Timeframes that are empty, partial or unwritten
    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    /// Format summary as string
    pub fn format(&self) -> String {
        let mut out = format!(
            r#"
Download Summary
================
Timeframes Succeeded: {}
Timeframes Failed: {}
Files Written: {}
Interrupted: {}
"#,
            self.succeeded(),
            self.failed(),
            self.written.len(),
            if self.interrupted { "yes" } else { "no" },
        );
        for (timeframe, path) in &self.written {
            out.push_str(&format!("  {:<6} {}\n", timeframe, path.display()));
        }
        out
    }
}
