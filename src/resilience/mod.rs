//! 弹性模块：指数退避重试与按请求的取消令牌。
//!
//! # Resilience Primitives Module
//!
//! Retry and cancellation plumbing for the generation exchange.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`retry`] | Exponential backoff (`base, base*2, base*4, ...`), fatal vs retryable classification |
//! | [`cancellation`] | Per-request tokens, bulk cancellation, timeout composition |
//!
//! ```rust
//! use qrgen_client::resilience::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, Duration::from_millis(500));
//! assert_eq!(policy.backoff(2), Duration::from_millis(1000));
//! ```

pub mod cancellation;
pub mod retry;

pub use cancellation::{run_guarded, AbortReason, CancellationRegistry, RegistrationGuard, RequestToken};
pub use retry::{execute_with_retry, RetryAttempt, RetryPolicy};
