use super::{GenerationTransport, TransportError, TransportResponse};
use crate::types::{ApiEnvelope, GenerationRequest};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

const SNIPPET_LEN: usize = 200;

/// reqwest-backed transport posting to `{base_url}{generate_path}`.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, generate_path: &str, timeout: Duration) -> Result<Self> {
        let base = url::Url::parse(base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base url: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(base_url.to_string())
                    .with_source("http_transport"),
            )
        })?;
        let endpoint = base.join(generate_path).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid generate path: {}", e),
                ErrorContext::new()
                    .with_field_path("generate_path")
                    .with_source("http_transport"),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::Network(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                after: self.timeout,
            }
        } else {
            Error::Network(TransportError::Http(e))
        }
    }
}

#[async_trait]
impl GenerationTransport for HttpTransport {
    async fn send(&self, request: &GenerationRequest, request_id: &str) -> Result<TransportResponse> {
        let start = Instant::now();
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-request-id", request_id)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_send_error(e))?;
        debug!(
            request_id,
            http_status = status.as_u16(),
            bytes = body.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "generation exchange finished"
        );

        match serde_json::from_str::<ApiEnvelope>(&body) {
            Ok(envelope) => Ok(TransportResponse {
                status: Some(status.as_u16()),
                envelope,
            }),
            Err(_) if !status.is_success() => Err(Error::Network(TransportError::Status {
                status: status.as_u16(),
                snippet: body.chars().take(SNIPPET_LEN).collect(),
            })),
            Err(e) => Err(Error::Network(TransportError::MalformedBody(format!(
                "could not decode envelope at line {} column {}",
                e.line(),
                e.column()
            )))),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
