//! 客户端配置：默认值、YAML 加载与环境变量覆盖。
//!
//! Client configuration.

use crate::cache::{CacheConfig, EvictionPolicy};
use crate::resilience::RetryPolicy;
use crate::validation::ValidationLimits;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Durations are written as integer milliseconds in config files.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub generate_path: String,
    /// Transport-level timeout for one HTTP exchange.
    #[serde(rename = "http_timeout_ms", with = "duration_ms")]
    pub http_timeout: Duration,
    /// Timeout signal composed with the caller's cancellation token, per attempt.
    #[serde(rename = "request_timeout_ms", with = "duration_ms")]
    pub request_timeout: Duration,
    pub max_attempts: u32,
    #[serde(rename = "retry_base_delay_ms", with = "duration_ms")]
    pub retry_base_delay: Duration,
    pub cache_max_entries: usize,
    #[serde(rename = "cache_ttl_ms", with = "duration_ms")]
    pub cache_ttl: Duration,
    pub eviction: EvictionPolicy,
    pub batch_concurrency: usize,
    pub validation: ValidationLimits,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            generate_path: "/api/generate".to_string(),
            http_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
            cache_max_entries: 100,
            cache_ttl: Duration::from_secs(3600),
            eviction: EvictionPolicy::Fifo,
            batch_concurrency: 10,
            validation: ValidationLimits::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl ClientConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("failed to parse client config: {}", e),
                ErrorContext::new().with_source("client_config"),
            )
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    /// Overlay `QRGEN_*` environment variables. Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("QRGEN_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        if let Some(secs) = env_parse::<u64>("QRGEN_HTTP_TIMEOUT_SECS") {
            self.http_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("QRGEN_REQUEST_TIMEOUT_MS") {
            self.request_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = env_parse::<u32>("QRGEN_MAX_ATTEMPTS") {
            self.max_attempts = n;
        }
        if let Some(ms) = env_parse::<u64>("QRGEN_RETRY_BASE_DELAY_MS") {
            self.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(n) = env_parse::<usize>("QRGEN_CACHE_MAX_ENTRIES") {
            self.cache_max_entries = n;
        }
        if let Some(secs) = env_parse::<u64>("QRGEN_CACHE_TTL_SECS") {
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("QRGEN_BATCH_CONCURRENCY") {
            self.batch_concurrency = n;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |field: &str, msg: &str| {
            Err(Error::configuration_with_context(
                msg.to_string(),
                ErrorContext::new()
                    .with_field_path(field.to_string())
                    .with_source("client_config"),
            ))
        };
        if let Err(e) = url::Url::parse(&self.base_url) {
            return fail("base_url", &format!("invalid base url: {}", e));
        }
        if self.max_attempts == 0 {
            return fail("max_attempts", "max_attempts must be at least 1");
        }
        if self.batch_concurrency == 0 {
            return fail("batch_concurrency", "batch_concurrency must be at least 1");
        }
        if self.request_timeout.is_zero() {
            return fail("request_timeout_ms", "request_timeout must be positive");
        }
        if self.validation.min_size > self.validation.max_size {
            return fail("validation.min_size", "min_size must not exceed max_size");
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_max_entries(self.cache_max_entries)
            .with_ttl(self.cache_ttl)
            .with_policy(self.eviction)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_base_delay)
    }
}
