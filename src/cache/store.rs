//! In-memory response store with TTL expiry and bounded eviction.

use super::key::CacheKey;
use crate::types::{GenerationRequest, GenerationResponse};
use indexmap::IndexMap;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Which entry leaves the store when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the earliest inserted entry; reads do not change the order.
    #[default]
    Fifo,
    /// Evict the least recently read or written entry.
    Lru,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl: Duration,
    pub policy: EvictionPolicy,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            default_ttl: Duration::from_secs(3600),
            policy: EvictionPolicy::Fifo,
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

struct CacheEntry {
    response: Arc<GenerationResponse>,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

enum Entries {
    Fifo(IndexMap<CacheKey, CacheEntry>),
    Lru(LruCache<CacheKey, CacheEntry>),
}

impl Entries {
    fn new(policy: EvictionPolicy) -> Self {
        match policy {
            EvictionPolicy::Fifo => Entries::Fifo(IndexMap::new()),
            EvictionPolicy::Lru => Entries::Lru(LruCache::unbounded()),
        }
    }

    fn len(&self) -> usize {
        match self {
            Entries::Fifo(m) => m.len(),
            Entries::Lru(m) => m.len(),
        }
    }

    fn peek(&self, key: &CacheKey) -> Option<&CacheEntry> {
        match self {
            Entries::Fifo(m) => m.get(key),
            Entries::Lru(m) => m.peek(key),
        }
    }

    /// Read access; promotes the entry under LRU.
    fn touch(&mut self, key: &CacheKey) -> Option<&CacheEntry> {
        match self {
            Entries::Fifo(m) => m.get(key),
            Entries::Lru(m) => m.get(key),
        }
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        match self {
            Entries::Fifo(m) => m.shift_remove(key),
            Entries::Lru(m) => m.pop(key),
        }
    }

    fn evict_one(&mut self) -> Option<CacheKey> {
        match self {
            Entries::Fifo(m) => m.shift_remove_index(0).map(|(k, _)| k),
            Entries::Lru(m) => m.pop_lru().map(|(k, _)| k),
        }
    }

    fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        match self {
            Entries::Fifo(m) => {
                m.insert(key, entry);
            }
            Entries::Lru(m) => {
                m.push(key, entry);
            }
        }
    }

    fn live_count(&self) -> usize {
        match self {
            Entries::Fifo(m) => m.values().filter(|e| !e.is_expired()).count(),
            Entries::Lru(m) => m.iter().filter(|(_, e)| !e.is_expired()).count(),
        }
    }

    fn clear(&mut self) {
        match self {
            Entries::Fifo(m) => m.clear(),
            Entries::Lru(m) => m.clear(),
        }
    }
}

/// Completed responses keyed by [`CacheKey`].
///
/// Expiry is checked lazily on access; there is no background sweep. Responses are
/// shared as `Arc<GenerationResponse>`, so a hit hands out the stored allocation
/// without allowing callers to mutate it.
pub struct ResponseCache {
    config: CacheConfig,
    entries: Mutex<Entries>,
    stats: AtomicStats,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(Entries::new(config.policy)),
            config,
            stats: AtomicStats::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, request: &GenerationRequest) -> Option<Arc<GenerationResponse>> {
        self.get_by_key(&CacheKey::for_request(request))
    }

    pub fn get_by_key(&self, key: &CacheKey) -> Option<Arc<GenerationResponse>> {
        if !self.config.enabled {
            return None;
        }
        let mut entries = self.lock();
        let expired = match entries.peek(key) {
            None => {
                AtomicStats::bump(&self.stats.misses);
                debug!(key = key.as_str(), "response cache miss");
                return None;
            }
            Some(entry) => entry.is_expired(),
        };
        if expired {
            entries.remove(key);
            AtomicStats::bump(&self.stats.expirations);
            AtomicStats::bump(&self.stats.misses);
            debug!(key = key.as_str(), "response cache entry expired");
            return None;
        }
        let response = entries.touch(key).map(|e| Arc::clone(&e.response));
        AtomicStats::bump(&self.stats.hits);
        debug!(key = key.as_str(), "response cache hit");
        response
    }

    /// Store with the configured default TTL.
    pub fn put(&self, request: &GenerationRequest, response: Arc<GenerationResponse>) {
        self.put_with_ttl(request, response, self.config.default_ttl)
    }

    /// Store a response. When the store is full, exactly one entry is evicted first.
    pub fn put_with_ttl(
        &self,
        request: &GenerationRequest,
        response: Arc<GenerationResponse>,
        ttl: Duration,
    ) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }
        let key = CacheKey::for_request(request);
        let mut entries = self.lock();
        // A re-inserted key counts as a fresh insertion.
        let replaced = entries.remove(&key).is_some();
        if !replaced && entries.len() >= self.config.max_entries {
            if let Some(evicted) = entries.evict_one() {
                AtomicStats::bump(&self.stats.evictions);
                debug!(evicted = evicted.as_str(), "response cache full, evicted one entry");
            }
        }
        entries.insert(
            key,
            CacheEntry {
                response,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        AtomicStats::bump(&self.stats.inserts);
    }

    pub fn invalidate(&self, request: &GenerationRequest) -> bool {
        self.lock().remove(&CacheKey::for_request(request)).is_some()
    }

    pub fn contains(&self, request: &GenerationRequest) -> bool {
        self.lock()
            .peek(&CacheKey::for_request(request))
            .map(|e| !e.is_expired())
            .unwrap_or(false)
    }

    /// Number of stored entries, expired ones included until they are next touched.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn live_len(&self) -> usize {
        self.lock().live_count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
