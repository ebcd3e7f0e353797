//! Chunked fetch pipeline
//!
//! Drives the chunk cursor through the requester and normalizer one request
//! at a time, then sorts and deduplicates the buffer into a series. An
//! external stop signal ends the loop at the next suspension point and the
//! candles gathered so far are returned, never discarded.

use crate::config::{FailurePolicy, FetchConfig};
use crate::data::{series_filename, Candle, CandleSeries, CsvStorage, Timeframe};
use crate::error::KlineError;
use crate::exchange::{
    normalize_batch, FetchRequest, HttpTransport, KlineRequester, KlineResponse, Transport,
};
use crate::fetch::{
    AdvancePolicy, DownloadSummary, FetchObserver, FetchReport, FetchedSeries, TimeRange,
    TimeRangeChunker,
};
use crate::Result;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Fetches candle series as configured by a [`FetchConfig`]
pub struct Fetcher<T> {
    requester: KlineRequester<T>,
    config: FetchConfig,
    stop: Option<watch::Receiver<bool>>,
}

impl Fetcher<HttpTransport> {
    /// Fetcher over HTTP using the configured request timeout
    pub fn connect(config: FetchConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Self::new(transport, config)
    }
}

impl<T: Transport> Fetcher<T> {
    /// Validate `config` and build a fetcher over `transport`
    pub fn new(transport: T, config: FetchConfig) -> Result<Self> {
        config.validate()?;
        let mut requester = KlineRequester::new(transport, config.exchange, config.retry);
        if let Some(base_url) = &config.base_url {
            requester = requester.with_base_url(base_url.clone());
        }
        Ok(Self {
            requester,
            config,
            stop: None,
        })
    }

    /// Stop fetching once `stop` turns `true`
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Check that the exchange answers with data for the start of the range.
    ///
    /// Requests up to five 1-minute candles of the first hour and returns
    /// the number of rows received.
    pub async fn probe(&self) -> Result<usize> {
        let start = self.config.range.start;
        let request = FetchRequest {
            symbol: self.config.symbol.clone(),
            timeframe: Timeframe::Min1,
            range: TimeRange::new(start, (start + 3600).min(self.config.range.end))?,
            limit: 5,
        };

        match self.requester.fetch(&request).await? {
            KlineResponse::Rows(rows) if !rows.is_empty() => {
                info!(
                    "{} answered with {} rows for {}",
                    self.config.exchange.name(),
                    rows.len(),
                    self.config.symbol
                );
                Ok(rows.len())
            }
            KlineResponse::Rows(_) => Err(KlineError::config(format!(
                "{} returned no data for {}",
                self.config.exchange.name(),
                self.config.symbol
            ))),
            KlineResponse::NoData { reason } => Err(KlineError::config(format!(
                "{} returned no data for {}: {}",
                self.config.exchange.name(),
                self.config.symbol,
                reason
            ))),
        }
    }

    /// Fetch the configured range for one timeframe.
    ///
    /// Chunk failures are handled per [`FailurePolicy`]; configuration
    /// problems are returned as errors.
    pub async fn fetch_timeframe(
        &self,
        timeframe: Timeframe,
        observer: &mut dyn FetchObserver,
    ) -> Result<FetchedSeries> {
        let config = &self.config;
        let exchange = config.exchange;
        let chunker = TimeRangeChunker::new(config.range, timeframe, config.limit)?;
        let advance = config.effective_advance();
        let mut stop = self.stop.clone();

        let mut report = FetchReport::new(
            &config.symbol,
            exchange.name(),
            timeframe,
            chunker.estimated_requests(),
        );
        observer.on_timeframe_started(timeframe, report.estimated_requests);

        let mut buffer: Vec<Candle> = Vec::new();
        let mut cursor = chunker.cursor();

        while let Some(chunk) = cursor.current() {
            if is_stopped(&stop) {
                report.interrupted = true;
                break;
            }

            let request = FetchRequest {
                symbol: config.symbol.clone(),
                timeframe,
                range: TimeRange {
                    start: chunk.start,
                    end: chunk.end,
                },
                limit: config.limit,
            };

            let result = tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => None,
                result = self.requester.fetch(&request) => Some(result),
            };
            let Some(result) = result else {
                report.interrupted = true;
                break;
            };

            let mut observed_next = None;
            match result {
                Ok(KlineResponse::Rows(rows)) => {
                    let batch = normalize_batch(&rows, exchange);
                    report.malformed_rows += batch.malformed;
                    if batch.candles.is_empty() {
                        report.empty_chunks += 1;
                        observer.on_chunk_empty(timeframe, &chunk, "no valid rows");
                    } else {
                        report.chunks_ok += 1;
                        observer.on_chunk_fetched(timeframe, &chunk, batch.candles.len());
                    }
                    if advance == AdvancePolicy::Observed {
                        observed_next = batch.next_open;
                    }
                    buffer.extend(batch.candles);
                }
                Ok(KlineResponse::NoData { reason }) => {
                    report.empty_chunks += 1;
                    observer.on_chunk_empty(timeframe, &chunk, &reason);
                }
                Err(err) if err.is_recoverable() => {
                    report.failed_chunks += 1;
                    observer.on_chunk_failed(timeframe, &chunk, &err);
                    if config.on_failure == FailurePolicy::Abort {
                        report.aborted = true;
                        break;
                    }
                }
                Err(err) => return Err(err),
            }

            cursor.advance(&chunk, observed_next);

            if cursor.current().is_some() && !config.request_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = stop_requested(&mut stop) => {
                        report.interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(config.request_delay) => {}
                }
            }
        }

        let range = config.range;
        buffer.retain(|c| range.contains(c.timestamp));
        let (series, duplicates_removed) = CandleSeries::from_unsorted(buffer);
        report.duplicates_removed = duplicates_removed;
        report.candles = series.len();
        observer.on_complete(&report);

        Ok(FetchedSeries { series, report })
    }

    /// Fetch every configured timeframe and write one CSV per timeframe.
    ///
    /// Runs [`Fetcher::probe`] first; an interrupt during the probe returns
    /// an empty summary. Timeframes without candles are not written. After an interrupt the timeframe in progress is still
    /// written and the remaining ones are skipped.
    pub async fn download_all(&self, observer: &mut dyn FetchObserver) -> Result<DownloadSummary> {
        let config = &self.config;
        let mut summary = DownloadSummary::default();

        let mut stop = self.stop.clone();
        tokio::select! {
            biased;
            _ = stop_requested(&mut stop) => {
                warn!("Interrupted before the first download");
                summary.interrupted = true;
                return Ok(summary);
            }
            probed = self.probe() => {
                probed?;
            }
        }

        let storage = CsvStorage::new(&config.output_dir);

        for &timeframe in &config.timeframes {
            if is_stopped(&self.stop) {
                summary.interrupted = true;
                break;
            }

            let FetchedSeries { series, report } =
                self.fetch_timeframe(timeframe, observer).await?;
            let interrupted = report.interrupted;

            if series.is_empty() {
                warn!("No data collected for {}", timeframe);
            } else {
                log_series_summary(timeframe, &series);
                let filename = series_filename(
                    config.exchange.file_prefix(),
                    &config.symbol,
                    timeframe.label(),
                    &config.range,
                );
                match storage.save(&filename, &series) {
                    Ok(path) => {
                        info!("Saved {} records to {}", series.len(), path.display());
                        summary.written.push((timeframe, path));
                    }
                    Err(e) => error!("Failed to save {}: {}", filename, e),
                }
            }
            summary.reports.push(report);

            if interrupted {
                summary.interrupted = true;
                break;
            }
        }

        info!(
            "Download finished: {}/{} timeframes succeeded",
            summary.succeeded(),
            config.timeframes.len()
        );
        Ok(summary)
    }
}

fn log_series_summary(timeframe: Timeframe, series: &CandleSeries) {
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        info!(
            "{}: {} records from {} to {}",
            timeframe,
            series.len(),
            first.datetime_string(),
            last.datetime_string()
        );
    }
    if let Some((low, high)) = series.price_range() {
        info!(
            "{}: price range {:.2} - {:.2}, total volume {:.2}",
            timeframe,
            low,
            high,
            series.total_volume()
        );
    }
}

fn is_stopped(stop: &Option<watch::Receiver<bool>>) -> bool {
    stop.as_ref().is_some_and(|rx| *rx.borrow())
}

/// Resolves once the stop signal is raised; never without a signal
async fn stop_requested(stop: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = stop {
        if rx.wait_for(|stopped| *stopped).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}
