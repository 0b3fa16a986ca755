use crate::cache::ResponseCache;
use crate::client::builder::QrClientBuilder;
use crate::client::config::ClientConfig;
use crate::resilience::{run_guarded, CancellationRegistry, RequestToken, RetryAttempt, RetryPolicy};
use crate::transport::GenerationTransport;
use crate::types::{GenerationRequest, GenerationResponse};
use crate::validation::{ValidationReport, Validator};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Generation client: owns one response cache and one cancellation registry.
///
/// Construct one per logical client and pass it around; separate instances share
/// nothing.
pub struct QrClient {
    config: ClientConfig,
    transport: Arc<dyn GenerationTransport>,
    cache: ResponseCache,
    registry: CancellationRegistry,
    validator: Validator,
    retry: RetryPolicy,
}

impl QrClient {
    pub fn builder() -> QrClientBuilder {
        QrClientBuilder::new()
    }

    /// Client against `base_url` with default settings (env overrides apply).
    pub fn new(base_url: &str) -> Result<Self> {
        QrClientBuilder::new().base_url(base_url).build()
    }

    pub(crate) fn from_parts(config: ClientConfig, transport: Arc<dyn GenerationTransport>) -> Self {
        Self {
            cache: ResponseCache::new(config.cache_config()),
            registry: CancellationRegistry::new(),
            validator: Validator::with_limits(config.validation.clone()),
            retry: config.retry_policy(),
            transport,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn validate(&self, request: &GenerationRequest) -> ValidationReport {
        self.validator.validate(request)
    }

    /// Register a token the caller can later pass to [`generate_with_token`](Self::generate_with_token)
    /// and cancel by id.
    pub fn issue_token(&self) -> RequestToken {
        self.registry.issue()
    }

    pub fn cancel(&self, request_id: &str) -> bool {
        self.registry.cancel(request_id)
    }

    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }

    /// Ids of exchanges currently tracked by the registry.
    pub fn in_flight(&self) -> Vec<String> {
        self.registry.in_flight()
    }

    /// Validate, consult the cache, then run the exchange with retry and timeout.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Arc<GenerationResponse>> {
        let token = self.registry.issue();
        self.execute(request, token, true).await
    }

    pub async fn generate_with_token(
        &self,
        request: &GenerationRequest,
        token: RequestToken,
    ) -> Result<Arc<GenerationResponse>> {
        self.execute(request, token, true).await
    }

    /// Like [`generate`](Self::generate) but skips the cache read; the fresh response is still stored.
    pub async fn generate_uncached(&self, request: &GenerationRequest) -> Result<Arc<GenerationResponse>> {
        let token = self.registry.issue();
        self.execute(request, token, false).await
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
        token: RequestToken,
        read_cache: bool,
    ) -> Result<Arc<GenerationResponse>> {
        let _registration = self.registry.guard(&token);

        self.validator.validate(request).into_result()?;

        if read_cache {
            if let Some(hit) = self.cache.get(request) {
                info!(request_id = token.id(), cached = true, "generation served from cache");
                return Ok(hit);
            }
        }

        let start = Instant::now();
        let timeout = self.config.request_timeout;
        let token_ref = &token;
        let exchange = self
            .retry
            .execute(move |attempt| self.exchange_once(request, token_ref, timeout, attempt));
        // The outer guard lets a cancel interrupt a backoff sleep as well.
        match run_guarded(&token, None, exchange).await {
            Ok(response) => {
                let response = Arc::new(response);
                self.cache.put(request, Arc::clone(&response));
                info!(
                    request_id = token.id(),
                    cached = false,
                    format = %response.format,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "generation completed"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(
                    request_id = token.id(),
                    kind = %e.kind(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "generation failed"
                );
                Err(e)
            }
        }
    }

    async fn exchange_once(
        &self,
        request: &GenerationRequest,
        token: &RequestToken,
        timeout: Duration,
        attempt: RetryAttempt,
    ) -> Result<GenerationResponse> {
        debug!(
            request_id = token.id(),
            attempt = attempt.index,
            transport = self.transport.name(),
            "starting generation exchange"
        );
        run_guarded(token, Some(timeout), async {
            let answer = self.transport.send(request, token.id()).await?;
            GenerationResponse::from_envelope(answer.envelope, request, answer.status)
        })
        .await
    }
}
