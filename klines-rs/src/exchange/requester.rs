//! Single bounded kline request with retry

use crate::config::RetryPolicy;
use crate::data::Timeframe;
use crate::error::KlineError;
use crate::exchange::{Exchange, Transport};
use crate::fetch::TimeRange;
use crate::Result;
use serde_json::Value;
use tracing::{debug, warn};

/// One bounded API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub range: TimeRange,
    /// Maximum rows to return
    pub limit: usize,
}

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq)]
pub enum KlineResponse {
    /// Raw rows in exchange layout
    Rows(Vec<Value>),
    /// The exchange answered but reported no data for the window
    NoData { reason: String },
}

impl KlineResponse {
    pub(crate) fn no_data(reason: impl Into<String>) -> Self {
        Self::NoData {
            reason: reason.into(),
        }
    }

    /// Number of rows, zero for `NoData`
    pub fn len(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::NoData { .. } => 0,
        }
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Executes [`FetchRequest`]s against one exchange.
///
/// Transport failures are retried per the [`RetryPolicy`]. A "no data"
/// answer is returned immediately and never retried. Once attempts run out
/// the request fails with [`KlineError::ExhaustedRetries`].
pub struct KlineRequester<T> {
    transport: T,
    exchange: Exchange,
    base_url: String,
    retry: RetryPolicy,
}

impl<T: Transport> KlineRequester<T> {
    /// Create requester using the exchange's default base URL
    pub fn new(transport: T, exchange: Exchange, retry: RetryPolicy) -> Self {
        Self {
            transport,
            exchange,
            base_url: exchange.base_url().to_string(),
            retry,
        }
    }

    /// Override the base URL (e.g. a testnet or a local mock)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Exchange this requester talks to
    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Retry policy in use
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch one window
    pub async fn fetch(&self, request: &FetchRequest) -> Result<KlineResponse> {
        let url = format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.exchange.endpoint()
        );
        let query = self.exchange.query(request)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.get_json(&url, &query).await {
                Ok(payload) => {
                    let response = self.exchange.interpret(payload);
                    if let KlineResponse::NoData { reason } = &response {
                        debug!("No data for {} {}: {}", request.symbol, request.timeframe, reason);
                    }
                    return Ok(response);
                }
                Err(err) => {
                    warn!(
                        "{} request failed on attempt {}/{}: {}",
                        self.exchange.name(),
                        attempt,
                        self.retry.max_attempts,
                        err
                    );
                    match self.retry.delay_after(attempt) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            return Err(KlineError::ExhaustedRetries {
                                attempts: attempt,
                                last: err,
                            })
                        }
                    }
                }
            }
        }
    }
}
