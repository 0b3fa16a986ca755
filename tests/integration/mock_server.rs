//! Mock HTTP server setup for integration tests

use mockito::{Matcher, Mock, Server, ServerGuard};
use qrgen_client::QrClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const GENERATE_PATH: &str = "/api/generate";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Client pointed at the mock server with short backoff so retries stay fast.
    pub fn create_test_client(&self) -> qrgen_client::Result<QrClient> {
        QrClient::builder()
            .ignore_env()
            .base_url(&self.base_url)
            .retry(3, Duration::from_millis(10))
            .request_timeout(Duration::from_secs(5))
            .build()
    }

    /// A successful generation answer, expected `hits` times.
    pub async fn mock_generate_success(&self, hits: usize) -> Mock {
        self.mock_json_response(200, &super::success_envelope().to_string())
            .await
            .expect(hits)
            .create_async()
            .await
    }

    /// A JSON answer with the given status; call `.expect(..).create_async()` on it.
    pub async fn mock_json_response(&self, status: usize, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", GENERATE_PATH)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Same as a success, but only when the request carries an `x-request-id`.
    pub async fn mock_requires_request_id(&self) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", GENERATE_PATH)
            .match_header(
                "x-request-id",
                Matcher::Regex("^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}$".into()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(super::success_envelope().to_string())
            .expect(1)
            .create_async()
            .await
    }
}
