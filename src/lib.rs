//! # qrgen-client
//!
//! 二维码生成客户端引擎：请求校验、响应缓存、重试与取消，以及导出用的栅格处理流水线。
//!
//! Client-side engine for a QR-code generation service: request validation,
//! response caching, retry and cancellation around the network exchange, and
//! the raster pipeline used to post-process and export generated codes.
//!
//! ## Overview
//!
//! ```text
//! GenerationRequest → Validator → ResponseCache ─hit──────────────────────→ GenerationResponse
//!                                      │miss
//!                                      └→ RetryPolicy(run_guarded(cancel | timeout | transport)) ─┘
//!
//! GenerationResponse → Raster → Pipeline(stage, stage, …) → encode / SizeBudgetOptimizer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qrgen_client::{GenerationRequest, Mode, QrClient};
//!
//! #[tokio::main]
//! async fn main() -> qrgen_client::Result<()> {
//!     let client = QrClient::builder().base_url("http://localhost:3000").build()?;
//!
//!     let request = GenerationRequest::new("https://example.com", Mode::Basic);
//!     let first = client.generate(&request).await?;
//!     // Identical request: served from the cache, no network exchange.
//!     let second = client.generate(&request).await?;
//!     assert!(std::sync::Arc::ptr_eq(&first, &second));
//!
//!     let raster = first.to_raster()?;
//!     println!("{}x{}", raster.width(), raster.height());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`QrClient`], builder, configuration, batch fan-out |
//! | [`types`] | Requests, responses, wire envelope, colors |
//! | [`validation`] | Field-level request validation |
//! | [`cache`] | Request-keyed response cache with TTL and bounded size |
//! | [`resilience`] | Exponential-backoff retry, cancellation registry, timeout composition |
//! | [`transport`] | The generation exchange (HTTP by default) |
//! | [`raster`] | Pixel surfaces, codecs, transform stages, size-budget optimizer |
//! | [`units`] | Pixel/physical unit conversion and print-size guidance |

pub mod cache;
pub mod client;
pub mod raster;
pub mod resilience;
pub mod transport;
pub mod types;
pub mod units;
pub mod validation;

// Re-export main types for convenience
pub use client::{BatchItemResult, BatchOutcome, ClientConfig, QrClient, QrClientBuilder};
pub use raster::{Pipeline, PipelineOperation, Raster, SizeBudgetOptimizer};
pub use types::{
    Color, ErrorCorrectionLevel, GenerationOptions, GenerationRequest, GenerationResponse, Mode,
    OutputFormat, Payload,
};
pub use validation::{ValidationReport, Validator};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind};
