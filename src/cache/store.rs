//! In-memory response store with LRU eviction and a fixed time-to-live.

use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::keys::ResponseKey;
use super::lock::lock_store;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_HIT: &str = "yatube_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "yatube_cache_miss_total";
pub(crate) const METRIC_EVICT: &str = "yatube_cache_evict_total";

/// Cached HTTP response.
#[derive(Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: Instant,
}

pub struct ResponseStore {
    ttl: Duration,
    responses: Mutex<LruCache<ResponseKey, CachedResponse>>,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl,
            responses: Mutex::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`; an expired entry is dropped and reported as a miss.
    pub fn get(&self, key: &ResponseKey) -> Option<CachedResponse> {
        let mut responses = lock_store(&self.responses, SOURCE, "get");
        let fresh = match responses.get(key) {
            Some(cached) if cached.stored_at.elapsed() < self.ttl => Some(cached.clone()),
            Some(_) => {
                responses.pop(key);
                None
            }
            None => None,
        };

        match fresh {
            Some(_) => counter!(METRIC_HIT).increment(1),
            None => counter!(METRIC_MISS).increment(1),
        }
        fresh
    }

    pub fn set(&self, key: ResponseKey, response: CachedResponse) {
        let evicted = lock_store(&self.responses, SOURCE, "set").push(key.clone(), response);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!(METRIC_EVICT).increment(1);
        }
    }

    /// Drop every stored response.
    pub fn clear(&self) {
        lock_store(&self.responses, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        lock_store(&self.responses, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
