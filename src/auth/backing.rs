//! Backing stores for the authentication cache
//!
//! [`AuthCache`] is the seam between the service and its storage. The
//! service only ever talks to one implementation at a time and replaces it
//! wholesale on reconfiguration.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::cache_object::CacheObject;
use crate::cache::{Cache, CacheConfig, CacheStats, EvictionListeners};
use crate::config::AuthCacheConfig;
use crate::logging::redact_key;
use crate::observability::metrics::{self, CacheTier};

/// Eviction listeners for cached authentication objects
pub type AuthEvictionListeners = EvictionListeners<Arc<CacheObject>>;

/// Storage contract for cached subjects.
///
/// None of the operations fail: a backend that cannot serve a request
/// degrades to a miss or to local storage.
#[async_trait]
pub trait AuthCache: Send + Sync {
    /// Evict every entry. `force` also clears shared storage while the
    /// process is not ready.
    async fn clear_all_entries(&self, force: bool);

    async fn get(&self, key: &str) -> Option<Arc<CacheObject>>;

    /// Removing an absent key is a no-op
    async fn remove(&self, key: &str);

    async fn insert(&self, key: String, object: Arc<CacheObject>);

    /// Cancel background eviction. Safe to call repeatedly.
    fn stop_eviction_task(&self);

    fn is_eviction_task_running(&self) -> bool;

    /// Statistics of the in-memory tier only. Entries held by a
    /// distributed store are not counted.
    fn stats(&self) -> CacheStats;
}

/// Authentication cache held entirely in process memory
pub struct InMemoryAuthCache {
    cache: Cache<String, Arc<CacheObject>>,
}

impl InMemoryAuthCache {
    pub fn new(config: &AuthCacheConfig, listeners: AuthEvictionListeners) -> Self {
        Self::named("auth-cache", config, listeners)
    }

    pub fn named(name: &str, config: &AuthCacheConfig, listeners: AuthEvictionListeners) -> Self {
        let cache_config = CacheConfig {
            name: name.to_string(),
            initial_size: config.initial_size(),
            max_entries: config.max_size(),
            timeout: config.timeout(),
        };
        Self {
            cache: Cache::with_listeners(cache_config, listeners),
        }
    }

    pub fn size(&self) -> usize {
        self.cache.size()
    }
}

#[async_trait]
impl AuthCache for InMemoryAuthCache {
    async fn clear_all_entries(&self, _force: bool) {
        self.cache.clear_all_entries();
    }

    async fn get(&self, key: &str) -> Option<Arc<CacheObject>> {
        let found = self.cache.get(&key.to_string());
        match found {
            Some(_) => {
                metrics::record_hit(CacheTier::Memory);
                debug!(key = %redact_key(key), "Authentication cache hit");
            }
            None => {
                metrics::record_miss();
                debug!(key = %redact_key(key), "Authentication cache miss");
            }
        }
        found
    }

    async fn remove(&self, key: &str) {
        self.cache.remove(&key.to_string());
    }

    async fn insert(&self, key: String, object: Arc<CacheObject>) {
        self.cache.insert(key, object);
    }

    fn stop_eviction_task(&self) {
        self.cache.stop_eviction_task();
    }

    fn is_eviction_task_running(&self) -> bool {
        self.cache.is_eviction_task_running()
    }

    fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
