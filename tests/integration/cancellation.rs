//! Integration tests for per-request cancellation and timeouts

use super::{scripted_client, ScriptedTransport};
use qrgen_client::resilience::AbortReason;
use qrgen_client::{Error, GenerationRequest, Mode};
use std::time::Duration;

fn request(tag: &str) -> GenerationRequest {
    GenerationRequest::new(format!("https://example.com/{}", tag), Mode::Basic)
}

#[tokio::test(start_paused = true)]
async fn test_cancel_aborts_only_target() {
    let transport = ScriptedTransport::new(Duration::from_millis(100));
    let client = scripted_client(transport.clone(), 1, Duration::ZERO, Duration::from_secs(5));

    let (req_a, req_b, req_c) = (request("a"), request("b"), request("c"));
    let (a, b, c) = (client.issue_token(), client.issue_token(), client.issue_token());
    let b_id = b.id().to_string();
    assert_eq!(client.in_flight().len(), 3);

    let (ra, rb, rc, cancelled) = tokio::join!(
        client.generate_with_token(&req_a, a),
        client.generate_with_token(&req_b, b),
        client.generate_with_token(&req_c, c),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            client.cancel(&b_id)
        }
    );

    assert!(cancelled);
    assert!(ra.is_ok());
    assert!(rc.is_ok());
    let err = rb.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.abort_reason(), Some(AbortReason::Cancelled));
    assert!(matches!(err, Error::Cancelled { ref request_id } if *request_id == b_id));

    assert!(client.in_flight().is_empty());
    assert!(!client.cancel(&b_id));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_aborts_everything() {
    let transport = ScriptedTransport::new(Duration::from_millis(100));
    let client = scripted_client(transport, 1, Duration::ZERO, Duration::from_secs(5));
    let requests = [request("1"), request("2"), request("3")];

    let (r1, r2, r3, count) = tokio::join!(
        client.generate(&requests[0]),
        client.generate(&requests[1]),
        client.generate(&requests[2]),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            client.cancel_all()
        }
    );

    assert_eq!(count, 3);
    for r in [r1, r2, r3] {
        assert!(r.unwrap_err().is_cancelled());
    }
    assert!(client.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_reported_distinctly_and_retried() {
    let transport = ScriptedTransport::new(Duration::from_millis(500));
    let client = scripted_client(
        transport.clone(),
        2,
        Duration::from_millis(10),
        Duration::from_millis(50),
    );

    let err = client.generate(&request("slow")).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(!err.is_cancelled());
    assert_eq!(err.abort_reason(), Some(AbortReason::TimedOut));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_wins_before_timeout() {
    let transport = ScriptedTransport::new(Duration::from_millis(500));
    let client = scripted_client(transport.clone(), 3, Duration::ZERO, Duration::from_millis(50));
    let token = client.issue_token();
    let id = token.id().to_string();
    let req = request("x");

    let (res, _) = tokio::join!(client.generate_with_token(&req, token), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.cancel(&id)
    });
    assert!(res.unwrap_err().is_cancelled());
    // Cancellation is final: no further attempts.
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_backoff() {
    let transport = ScriptedTransport::failing(Duration::ZERO, 10);
    let client = scripted_client(transport.clone(), 5, Duration::from_secs(1), Duration::from_secs(5));
    let token = client.issue_token();
    let id = token.id().to_string();

    let req = request("y");

    let start = tokio::time::Instant::now();
    let (res, _) = tokio::join!(client.generate_with_token(&req, token), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.cancel(&id)
    });
    assert!(res.unwrap_err().is_cancelled());
    assert_eq!(transport.calls(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_retry_backoff_then_success() {
    let transport = ScriptedTransport::failing(Duration::ZERO, 2);
    let client = scripted_client(transport.clone(), 3, Duration::from_millis(100), Duration::from_secs(5));

    let start = tokio::time::Instant::now();
    let resp = client.generate(&request("flaky")).await.unwrap();
    assert!(resp.success);
    assert_eq!(transport.calls(), 3);
    // 100ms before the second attempt, 200ms before the third.
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}
