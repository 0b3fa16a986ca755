//! Integration tests for batch generation

use super::mock_server::MockServerFixture;
use super::{scripted_client, ScriptedTransport};
use qrgen_client::{Error, ErrorKind, GenerationRequest, Mode};
use std::time::Duration;

fn numbered(i: usize) -> GenerationRequest {
    GenerationRequest::new(format!("https://example.com/item/{}", i), Mode::Basic)
        .with_filename(format!("item-{}.png", i))
}

#[tokio::test]
async fn test_batch_with_partial_failures() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_generate_success(4).await;
    let client = fixture.create_test_client().unwrap();

    let mut requests: Vec<_> = (1..=5).map(numbered).collect();
    requests[2] = GenerationRequest::new("", Mode::Basic);

    let outcome = client.generate_batch(requests).await;
    assert_eq!(outcome.len(), 5);
    assert_eq!(outcome.success_count(), 4);
    assert_eq!(outcome.failure_count(), 1);
    assert!(!outcome.all_succeeded());
    assert!((outcome.success_rate() - 0.8).abs() < f64::EPSILON);

    for (i, item) in outcome.items.iter().enumerate() {
        assert_eq!(item.index, i);
        if i == 2 {
            let err = item.error().unwrap();
            assert!(matches!(err, Error::Validation { .. }));
            assert_eq!(err.kind(), ErrorKind::Validation);
        } else {
            assert!(item.is_success());
        }
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_batch_execution_order_preserving() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_generate_success(8).await;
    let client = fixture.create_test_client().unwrap();

    let outcome = client.generate_batch((0..8).map(numbered).collect()).await;
    let names: Vec<String> = outcome
        .successes()
        .map(|(_, resp)| resp.filename.clone())
        .collect();
    let expected: Vec<String> = (0..8).map(|i| format!("item-{}.png", i)).collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_empty_batch() {
    let transport = ScriptedTransport::new(Duration::ZERO);
    let client = scripted_client(transport.clone(), 1, Duration::ZERO, Duration::from_secs(1));
    let outcome = client.generate_batch(Vec::new()).await;
    assert!(outcome.is_empty());
    assert_eq!(outcome.success_rate(), 0.0);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_batch_concurrency_limit() {
    let transport = ScriptedTransport::new(Duration::from_millis(100));
    let client = qrgen_client::QrClient::builder()
        .ignore_env()
        .transport(transport.clone())
        .batch_concurrency(2)
        .build()
        .unwrap();

    let start = tokio::time::Instant::now();
    let outcome = client.generate_batch((0..6).map(numbered).collect()).await;
    assert!(outcome.all_succeeded());
    assert_eq!(transport.calls(), 6);
    // Six 100ms exchanges, two at a time.
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}
