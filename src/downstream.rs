//! Client for the downstream classification service.
//!
//! One operation: send an ordered list of items, receive a result list of
//! equal length. Stateless aside from the endpoint URL and timeout; no
//! retries at this layer.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ProxyError;

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    sequences: &'a [Value],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    results: Vec<Value>,
}

/// Stateless caller of the downstream `/classify` endpoint.
#[derive(Clone)]
pub struct DownstreamClient {
    client: Client,
    url: String,
}

impl DownstreamClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Classify a batch of items.
    ///
    /// Guarantees that a successful return has exactly one result per item,
    /// in item order; a shorter or longer result list is a protocol error.
    pub async fn classify(&self, items: &[Value]) -> Result<Vec<Value>, ProxyError> {
        debug!(url = %self.url, items = items.len(), "calling downstream");

        let response = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { sequences: items })
            .send()
            .await
            .map_err(classify_call_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxyError::DownstreamProtocol(format!(
                "downstream returned status {status}: {body}"
            )));
        }

        let body: ClassifyResponse = response.json().await.map_err(classify_call_error)?;

        if body.results.len() != items.len() {
            return Err(ProxyError::DownstreamProtocol(format!(
                "expected {} results, got {}",
                items.len(),
                body.results.len()
            )));
        }

        Ok(body.results)
    }
}

/// Map a reqwest error from any phase of the call to the proxy taxonomy.
///
/// The client-level timeout covers the whole round trip, so a deadline can
/// expire while reading the body just as well as while connecting; both
/// must surface as `DownstreamTimeout`.
fn classify_call_error(err: reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        ProxyError::DownstreamTimeout(err.to_string())
    } else if err.is_decode() {
        ProxyError::DownstreamProtocol(format!("invalid response body: {err}"))
    } else {
        ProxyError::DownstreamTransport(err.to_string())
    }
}
