//! Integration tests for the single-request lifecycle over HTTP

use super::mock_server::MockServerFixture;
use super::ScriptedTransport;
use qrgen_client::transport::{HttpTransport, TransportError};
use qrgen_client::{ClientConfig, Error, GenerationRequest, Mode, OutputFormat, QrClient};
use std::sync::Arc;
use std::time::Duration;

fn example_request() -> GenerationRequest {
    GenerationRequest::new("https://example.com", Mode::Basic)
}

#[tokio::test]
async fn test_identical_request_served_from_cache() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_generate_success(1).await;
    let client = fixture.create_test_client().unwrap();

    let first = client.generate(&example_request()).await.unwrap();
    assert!(first.success);
    assert_eq!(first.format, OutputFormat::Png);

    let second = client.generate(&example_request()).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    mock.assert_async().await;
    let stats = client.cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(client.cache().len(), 1);
}

#[tokio::test]
async fn test_uncached_call_still_refreshes_cache() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_generate_success(2).await;
    let client = fixture.create_test_client().unwrap();

    let first = client.generate(&example_request()).await.unwrap();
    let fresh = client.generate_uncached(&example_request()).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));

    let cached = client.generate(&example_request()).await.unwrap();
    assert!(Arc::ptr_eq(&fresh, &cached));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_response_fields_and_server_meta() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_generate_success(1).await;
    let client = fixture.create_test_client().unwrap();

    let resp = client
        .generate(&example_request().with_filename("promo.png"))
        .await
        .unwrap();
    assert_eq!(resp.filename, "promo.png");
    assert_eq!(resp.size_px.width, 21);
    assert_eq!(resp.metadata.mask_pattern, 3);
    assert_eq!(resp.timestamp, "2024-05-01T10:00:00Z");
    let meta = resp.server_meta.as_ref().unwrap();
    assert_eq!(meta.request_id.as_deref(), Some("srv-123"));
    assert_eq!(meta.processing_time_ms, Some(12));

    let raster = resp.to_raster().unwrap();
    assert_eq!(raster.dimensions(), (21, 21));
}

#[tokio::test]
async fn test_request_id_header_is_sent() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_requires_request_id().await;
    let client = fixture.create_test_client().unwrap();

    client.generate(&example_request()).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retryable_server_failure_then_success() {
    let fixture = MockServerFixture::new().await;
    let overloaded = fixture
        .mock_json_response(503, r#"{"success":false,"error":"Service temporarily overloaded"}"#)
        .await
        .expect(2)
        .create_async()
        .await;
    let ok = fixture.mock_generate_success(1).await;
    let client = fixture.create_test_client().unwrap();

    let resp = client.generate(&example_request()).await.unwrap();
    assert!(resp.success);
    overloaded.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_fatal_server_message_not_retried() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json_response(
            400,
            r#"{"success":false,"error":{"message":"Invalid data format","code":"BAD_DATA"}}"#,
        )
        .await
        .expect(1)
        .create_async()
        .await;
    let client = fixture.create_test_client().unwrap();

    let err = client.generate(&example_request()).await.unwrap_err();
    match &err {
        Error::Generation { message, status } => {
            assert_eq!(message, "Invalid data format");
            assert_eq!(*status, Some(400));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!err.is_retryable());
    mock.assert_async().await;
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_malformed_body_exhausts_retries() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json_response(200, "<html>gateway</html>")
        .await
        .expect(3)
        .create_async()
        .await;
    let client = fixture.create_test_client().unwrap();

    let err = client.generate(&example_request()).await.unwrap_err();
    assert!(matches!(err, Error::Network(TransportError::MalformedBody(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_validation_failure_never_reaches_network() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_generate_success(0).await;
    let client = fixture.create_test_client().unwrap();

    let err = client
        .generate(&GenerationRequest::new("   ", Mode::Basic))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(err.context().and_then(|c| c.field_path.as_deref()), Some("data"));
    mock.assert_async().await;
    assert!(client.in_flight().is_empty());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Nothing listens on port 9 (discard) on a test host.
    let client = QrClient::builder()
        .ignore_env()
        .base_url("http://127.0.0.1:9")
        .retry(2, Duration::from_millis(5))
        .build()
        .unwrap();
    let err = client.generate(&example_request()).await.unwrap_err();
    assert!(err.is_retryable(), "{:?}", err);
}

#[tokio::test]
async fn test_unreachable_server_retried_despite_marker_in_url() {
    let config = ClientConfig {
        base_url: "http://127.0.0.1:9".into(),
        generate_path: "/required/api/generate".into(),
        ..Default::default()
    };
    let client = QrClient::builder()
        .ignore_env()
        .config(config)
        .retry(2, Duration::from_millis(5))
        .build()
        .unwrap();
    let err = client.generate(&example_request()).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)), "{:?}", err);
    assert!(err.is_retryable(), "{:?}", err);
}

#[test]
fn test_bad_base_url_is_configuration_error() {
    let err = QrClient::builder()
        .ignore_env()
        .base_url("not a url")
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::Configuration { .. }));

    // An injected transport does not bypass the check.
    let err = QrClient::builder()
        .ignore_env()
        .base_url("not a url")
        .transport(ScriptedTransport::new(Duration::ZERO))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::Configuration { .. }));

    let transport = HttpTransport::new("http://qr.local:8080", "/api/generate", Duration::from_secs(1)).unwrap();
    assert_eq!(transport.endpoint(), "http://qr.local:8080/api/generate");
}
