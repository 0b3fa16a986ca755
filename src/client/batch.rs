//! Batch fan-out over [`QrClient::generate`].

use crate::client::core::QrClient;
use crate::types::{GenerationRequest, GenerationResponse};
use crate::{Error, Result};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Outcome of one request in a batch, tagged with its input position.
#[derive(Debug)]
pub struct BatchItemResult {
    pub index: usize,
    pub result: Result<Arc<GenerationResponse>>,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn response(&self) -> Option<&Arc<GenerationResponse>> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }
}

/// Per-item results in input order. One failure never fails the batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub items: Vec<BatchItemResult>,
    pub execution_time: Duration,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.items.len() - self.success_count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(BatchItemResult::is_success)
    }

    pub fn success_rate(&self) -> f64 {
        if self.items.is_empty() {
            0.0
        } else {
            self.success_count() as f64 / self.items.len() as f64
        }
    }

    pub fn successes(&self) -> impl Iterator<Item = (usize, &Arc<GenerationResponse>)> {
        self.items.iter().filter_map(|i| i.response().map(|r| (i.index, r)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &Error)> {
        self.items.iter().filter_map(|i| i.error().map(|e| (i.index, e)))
    }

    pub fn into_results(self) -> Vec<Result<Arc<GenerationResponse>>> {
        self.items.into_iter().map(|i| i.result).collect()
    }
}

impl QrClient {
    /// Run every request concurrently (bounded by `batch_concurrency`) and
    /// collect per-item outcomes in input order.
    pub async fn generate_batch(&self, requests: Vec<GenerationRequest>) -> BatchOutcome {
        let start = Instant::now();
        let concurrency = self.config().batch_concurrency.max(1);
        let total = requests.len();

        let mut items: Vec<BatchItemResult> = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| async move {
                let result = self.generate(&request).await;
                BatchItemResult { index, result }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        items.sort_by_key(|i| i.index);

        let outcome = BatchOutcome {
            items,
            execution_time: start.elapsed(),
        };
        info!(
            total,
            succeeded = outcome.success_count(),
            failed = outcome.failure_count(),
            duration_ms = outcome.execution_time.as_millis() as u64,
            "batch generation finished"
        );
        outcome
    }
}
