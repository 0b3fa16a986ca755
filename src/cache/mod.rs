//! 响应缓存模块：按请求派生键缓存已完成的生成结果。
//!
//! # Response Caching Module
//!
//! Completed generation responses are cached so that an identical request
//! returns immediately with no network exchange.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheKey`] | SHA-256 over a structural encoding of `(data, mode, options)` |
//! | [`ResponseCache`] | Bounded store with per-entry TTL, checked lazily on access |
//! | [`CacheConfig`] | Capacity, default TTL and eviction policy |
//! | [`EvictionPolicy`] | FIFO by insertion (default) or LRU |
//! | [`CacheStats`] | Hit/miss/eviction counters |
//!
//! ## Example
//!
//! ```rust
//! use qrgen_client::cache::{CacheConfig, ResponseCache};
//! use qrgen_client::types::{GenerationRequest, Mode};
//! use std::time::Duration;
//!
//! let cache = ResponseCache::new(
//!     CacheConfig::new()
//!         .with_max_entries(100)
//!         .with_ttl(Duration::from_secs(3600)),
//! );
//! assert!(cache.get(&GenerationRequest::new("https://example.com", Mode::Basic)).is_none());
//! ```

mod key;
mod store;

pub use key::CacheKey;
pub use store::{CacheConfig, CacheStats, EvictionPolicy, ResponseCache};
