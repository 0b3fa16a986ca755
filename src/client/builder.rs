use crate::client::config::ClientConfig;
use crate::client::core::QrClient;
use crate::transport::{GenerationTransport, HttpTransport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating clients with custom configuration.
///
/// Resolution order for every knob: explicit setter, then `QRGEN_*` environment
/// variable, then the base [`ClientConfig`] (defaults unless [`config`](Self::config) was given).
pub struct QrClientBuilder {
    config: Option<ClientConfig>,
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    max_attempts: Option<u32>,
    retry_base_delay: Option<Duration>,
    cache_max_entries: Option<usize>,
    cache_ttl: Option<Duration>,
    batch_concurrency: Option<usize>,
    transport: Option<Arc<dyn GenerationTransport>>,
    read_env: bool,
}

impl QrClientBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            base_url: None,
            request_timeout: None,
            max_attempts: None,
            retry_base_delay: None,
            cache_max_entries: None,
            cache_ttl: None,
            batch_concurrency: None,
            transport: None,
            read_env: true,
        }
    }

    /// Start from a full configuration (e.g. loaded from YAML).
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Retry budget: total attempts and the base of the exponential backoff.
    pub fn retry(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = Some(max_attempts);
        self.retry_base_delay = Some(base_delay);
        self
    }

    pub fn cache(mut self, max_entries: usize, ttl: Duration) -> Self {
        self.cache_max_entries = Some(max_entries);
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn batch_concurrency(mut self, n: usize) -> Self {
        self.batch_concurrency = Some(n.max(1));
        self
    }

    /// Inject a transport instead of the default HTTP one.
    pub fn transport(mut self, transport: Arc<dyn GenerationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Skip `QRGEN_*` environment overrides (useful in tests).
    pub fn ignore_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    pub fn build(self) -> Result<QrClient> {
        let mut config = self.config.unwrap_or_default();
        if self.read_env {
            config.apply_env();
        }
        if let Some(v) = self.base_url {
            config.base_url = v;
        }
        if let Some(v) = self.request_timeout {
            config.request_timeout = v;
        }
        if let Some(v) = self.max_attempts {
            config.max_attempts = v;
        }
        if let Some(v) = self.retry_base_delay {
            config.retry_base_delay = v;
        }
        if let Some(v) = self.cache_max_entries {
            config.cache_max_entries = v;
        }
        if let Some(v) = self.cache_ttl {
            config.cache_ttl = v;
        }
        if let Some(v) = self.batch_concurrency {
            config.batch_concurrency = v;
        }
        config.validate()?;

        let transport: Arc<dyn GenerationTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(
                &config.base_url,
                &config.generate_path,
                config.http_timeout,
            )?),
        };

        Ok(QrClient::from_parts(config, transport))
    }
}

impl Default for QrClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
