//! Integration tests with mock HTTP server and scripted transports

pub mod batch;
pub mod cancellation;
pub mod generation;
pub mod mock_server;

use async_trait::async_trait;
use base64::Engine as _;
use qrgen_client::transport::{GenerationTransport, TransportError, TransportResponse};
use qrgen_client::{Color, Error, GenerationRequest, OutputFormat, QrClient, Raster};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A 21x21 PNG as the server would return it.
pub fn png_data_url() -> String {
    let png = Raster::new(21, 21, Color::WHITE)
        .encode(OutputFormat::Png, None)
        .expect("encode fixture png");
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&png)
    )
}

pub fn success_envelope() -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "format": "png",
            "image": png_data_url(),
            "size": { "width": 21, "height": 21 },
            "metadata": {
                "version": 1,
                "errorCorrectionLevel": "M",
                "maskPattern": 3,
                "segments": [{ "mode": "byte", "numChars": 19 }]
            }
        },
        "meta": {
            "requestId": "srv-123",
            "processingTimeMs": 12,
            "timestamp": "2024-05-01T10:00:00Z"
        }
    })
}

/// In-process transport: sleeps `delay`, fails the first `fail_first` calls
/// with a retryable network error, then answers with [`success_envelope`].
pub struct ScriptedTransport {
    pub delay: Duration,
    pub fail_first: usize,
    pub calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            fail_first: 0,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(delay: Duration, fail_first: usize) -> Arc<Self> {
        Arc::new(Self {
            delay,
            fail_first,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationTransport for ScriptedTransport {
    async fn send(&self, _request: &GenerationRequest, _request_id: &str) -> qrgen_client::Result<TransportResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if n < self.fail_first {
            return Err(Error::Network(TransportError::Other("connection reset by peer".into())));
        }
        Ok(TransportResponse {
            status: Some(200),
            envelope: serde_json::from_value(success_envelope())?,
        })
    }
}

pub fn scripted_client(
    transport: Arc<ScriptedTransport>,
    max_attempts: u32,
    base_delay: Duration,
    request_timeout: Duration,
) -> QrClient {
    QrClient::builder()
        .ignore_env()
        .transport(transport)
        .retry(max_attempts, base_delay)
        .request_timeout(request_timeout)
        .build()
        .expect("build scripted client")
}
