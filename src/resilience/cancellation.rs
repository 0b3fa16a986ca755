//! Per-request cancellation tokens and timeout composition.

use crate::{Error, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Which signal stopped an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The caller (or `cancel_all`) asked for it.
    Cancelled,
    /// The internal timeout fired first.
    TimedOut,
}

/// Cancellation handle for one in-flight request.
///
/// Clones share the same underlying signal.
#[derive(Debug, Clone)]
pub struct RequestToken {
    id: String,
    inner: CancellationToken,
}

impl RequestToken {
    fn new(id: String) -> Self {
        Self {
            id,
            inner: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }
}

/// Table of in-flight request tokens, keyed by request id.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<String, RequestToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RequestToken>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a fresh token under a generated id.
    pub fn issue(&self) -> RequestToken {
        self.issue_with_id(Uuid::new_v4().to_string())
    }

    /// Register a fresh token under `id`, replacing (and cancelling) any previous holder.
    pub fn issue_with_id(&self, id: impl Into<String>) -> RequestToken {
        let token = RequestToken::new(id.into());
        if let Some(previous) = self.lock().insert(token.id.clone(), token.clone()) {
            warn!(request_id = previous.id(), "request id reused, cancelling previous holder");
            previous.cancel();
        }
        token
    }

    /// Abort one exchange and forget it. Returns false when `id` is not tracked.
    pub fn cancel(&self, id: &str) -> bool {
        match self.lock().remove(id) {
            Some(token) => {
                token.cancel();
                debug!(request_id = id, "request cancelled");
                true
            }
            None => false,
        }
    }

    /// Abort every tracked exchange. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<RequestToken> = self.lock().drain().map(|(_, t)| t).collect();
        for token in &drained {
            token.cancel();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "cancelled all in-flight requests");
        }
        drained.len()
    }

    /// Forget a token without cancelling it (the exchange finished).
    pub fn release(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn is_tracked(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn in_flight(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep `token` registered until the returned guard drops.
    pub fn guard<'a>(&'a self, token: &RequestToken) -> RegistrationGuard<'a> {
        RegistrationGuard {
            registry: self,
            id: token.id.clone(),
        }
    }
}

/// Releases a token from its registry on drop: completion, failure, or the
/// owning future being dropped.
pub struct RegistrationGuard<'a> {
    registry: &'a CancellationRegistry,
    id: String,
}

impl Drop for RegistrationGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}

/// Race `fut` against the caller's token and an optional timeout; first to fire wins.
///
/// A cancellation that is already signalled when polling starts takes precedence
/// over the timeout, and both take precedence over a result that is ready in the
/// same poll.
pub async fn run_guarded<T, F>(token: &RequestToken, timeout: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let deadline = async {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(abort_error(token, AbortReason::Cancelled, timeout)),
        _ = deadline => Err(abort_error(token, AbortReason::TimedOut, timeout)),
        res = fut => res,
    }
}

fn abort_error(token: &RequestToken, reason: AbortReason, timeout: Option<Duration>) -> Error {
    match reason {
        AbortReason::Cancelled => Error::Cancelled {
            request_id: token.id.clone(),
        },
        AbortReason::TimedOut => {
            warn!(request_id = token.id(), "request timed out");
            Error::Timeout {
                after: timeout.unwrap_or_default(),
            }
        }
    }
}

impl Error {
    /// Which signal aborted the exchange, if this error is an abort.
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self {
            Error::Cancelled { .. } => Some(AbortReason::Cancelled),
            Error::Timeout { .. } => Some(AbortReason::TimedOut),
            _ => None,
        }
    }
}
