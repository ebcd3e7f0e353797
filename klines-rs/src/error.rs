//! Error types for fetching, storing and resampling klines

use thiserror::Error;

/// Network-level failure of a single request attempt. Always retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection error: {0}")]
    Connect(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("request error: {0}")]
    Request(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Errors surfaced by the library
#[derive(Debug, Error)]
pub enum KlineError {
    /// A single transport failure, before the retry policy gave up
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Every attempt of a chunk request failed
    #[error("giving up after {attempts} attempts: {last}")]
    ExhaustedRetries {
        attempts: u32,
        last: TransportError,
    },

    /// A loaded CSV lacks columns of the canonical schema
    #[error("missing required columns: {}", missing.join(", "))]
    SchemaValidation { missing: Vec<String> },

    /// Invalid or inconsistent configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KlineError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the caller may continue with the next unit of work
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ExhaustedRetries { .. })
    }
}
