//! HTTP transport used by the requester

use crate::error::TransportError;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Performs one GET request and returns the decoded JSON body.
///
/// Implementations report network problems, non-success HTTP statuses and
/// undecodable bodies as [`TransportError`].
pub trait Transport {
    fn get_json(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

/// [`Transport`] backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("klines-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get_json(
        &self,
        url: &str,
        query: &[(&'static str, String)],
    ) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}
