//! 传输层：生成接口的网络交换。
//!
//! Network exchange with the generation endpoint.
//!
//! [`GenerationTransport`] is the seam between the client lifecycle and the wire;
//! [`HttpTransport`] is the reqwest-backed implementation. Tests and offline hosts
//! can inject their own.

mod http;

pub use http::HttpTransport;

use crate::types::{ApiEnvelope, GenerationRequest};
use crate::Result;
use async_trait::async_trait;

/// Decoded answer of one exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status, when the transport has one.
    pub status: Option<u16>,
    pub envelope: ApiEnvelope,
}

#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Perform a single exchange (no retry, no cancellation handling).
    async fn send(&self, request: &GenerationRequest, request_id: &str) -> Result<TransportResponse>;

    fn name(&self) -> &'static str {
        "custom"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} with unreadable body: {snippet}")]
    Status { status: u16, snippet: String },

    #[error("Malformed response body: {0}")]
    MalformedBody(String),

    #[error("Transport error: {0}")]
    Other(String),
}
