//! Cache key derivation.

use crate::types::{GenerationOptions, GenerationRequest, Mode};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Deterministic identity of a generation request.
///
/// Two requests share a key exactly when their `data`, `mode` and `options` are
/// field-wise equal. `filename` does not take part: it only names the download.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub hash: String,
}

/// The subset of a request that identifies its output.
///
/// Serialized as JSON, so every field is delimited and escaped; `"ab" + "c"` and
/// `"a" + "bc"` can never produce the same material.
#[derive(Serialize)]
struct KeyMaterial<'a> {
    data: &'a str,
    mode: Mode,
    options: &'a GenerationOptions,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    pub fn for_request(request: &GenerationRequest) -> Self {
        let material = KeyMaterial {
            data: &request.data,
            mode: request.mode,
            options: &request.options,
        };
        let canonical = serde_json::to_vec(&material).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        let hash: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
        Self::new(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&GenerationRequest> for CacheKey {
    fn from(request: &GenerationRequest) -> Self {
        Self::for_request(request)
    }
}
