//! Error types for the batching proxy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Proxy error taxonomy as visible at the HTTP boundary.
///
/// The dispatcher classifies a downstream outcome once per batch and
/// publishes the same kind to every ticket in that batch, so the variants
/// carry owned strings and the whole enum is `Clone`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProxyError {
    /// Malformed intake body or unknown strategy value
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Downstream could not be reached
    #[error("Downstream unreachable: {0}")]
    DownstreamTransport(String),

    /// Downstream returned a non-success status or a malformed response
    #[error("Downstream protocol error: {0}")]
    DownstreamProtocol(String),

    /// Configured round-trip deadline exceeded
    #[error("Downstream timed out: {0}")]
    DownstreamTimeout(String),

    /// Invariant violation inside the proxy
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::DownstreamTransport(_) => StatusCode::BAD_GATEWAY,
            ProxyError::DownstreamProtocol(_) => StatusCode::BAD_GATEWAY,
            ProxyError::DownstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::BadRequest(_) => "BadRequest",
            ProxyError::DownstreamTransport(_) => "DownstreamTransport",
            ProxyError::DownstreamProtocol(_) => "DownstreamProtocol",
            ProxyError::DownstreamTimeout(_) => "DownstreamTimeout",
            ProxyError::Internal(_) => "Internal",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
            }
        }));

        (self.status(), body).into_response()
    }
}
