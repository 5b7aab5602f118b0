//! Authentication cache backed by a distributed store
//!
//! Objects are encoded with bincode and written to the shared store. The
//! local [`InMemoryAuthCache`] takes over for objects that cannot or must not
//! leave the process, and for writes the shared store rejects. Reads consult
//! the shared store first.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::backing::{AuthCache, InMemoryAuthCache};
use super::cache_object::CacheObject;
use crate::cache::CacheStats;
use crate::distributed::DistributedCache;
use crate::lifecycle::ProcessLifecycle;
use crate::logging::redact_key;
use crate::observability::metrics::{self, CacheTier, FallbackReason};

/// Predicate selecting objects that are only ever cached locally
pub type InMemoryPolicy = Arc<dyn Fn(&CacheObject) -> bool + Send + Sync>;

/// Policy keeping subjects with process-local credentials in memory, so they
/// are never offered to the store for serialization
pub fn non_distributable_policy() -> InMemoryPolicy {
    Arc::new(|object: &CacheObject| !object.subject().is_distributable())
}

pub struct JCacheAuthCache {
    distributed: Arc<dyn DistributedCache>,
    fallback: InMemoryAuthCache,
    lifecycle: Arc<ProcessLifecycle>,
    policies: Vec<InMemoryPolicy>,
}

impl JCacheAuthCache {
    pub fn new(
        distributed: Arc<dyn DistributedCache>,
        fallback: InMemoryAuthCache,
        lifecycle: Arc<ProcessLifecycle>,
    ) -> Self {
        Self {
            distributed,
            fallback,
            lifecycle,
            policies: Vec::new(),
        }
    }

    /// Keep objects matching `policy` out of the distributed store
    pub fn with_in_memory_policy(mut self, policy: InMemoryPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn with_in_memory_policies(mut self, policies: impl IntoIterator<Item = InMemoryPolicy>) -> Self {
        self.policies.extend(policies);
        self
    }

    pub fn fallback(&self) -> &InMemoryAuthCache {
        &self.fallback
    }

    fn is_in_memory_only(&self, object: &CacheObject) -> bool {
        self.policies.iter().any(|policy| policy(object))
    }

    async fn insert_locally(&self, key: String, object: Arc<CacheObject>, reason: FallbackReason) {
        metrics::record_fallback(reason);
        self.fallback.insert(key, object).await;
    }
}

#[async_trait]
impl AuthCache for JCacheAuthCache {
    async fn clear_all_entries(&self, force: bool) {
        self.fallback.clear_all_entries(force).await;

        if !force && !self.lifecycle.is_ready() {
            debug!(
                cache = %self.distributed.name(),
                state = %self.lifecycle.state(),
                "Process not ready, leaving distributed cache untouched"
            );
            return;
        }

        if let Err(e) = self.distributed.remove_all().await {
            warn!(cache = %self.distributed.name(), error = %e, "Failed to clear distributed cache");
        }
    }

    async fn get(&self, key: &str) -> Option<Arc<CacheObject>> {
        match self.distributed.get(key).await {
            Ok(Some(bytes)) => match CacheObject::from_bytes(&bytes) {
                Ok(object) => {
                    metrics::record_hit(CacheTier::Distributed);
                    debug!(key = %redact_key(key), "Distributed cache hit");
                    return Some(Arc::new(object));
                }
                Err(e) => {
                    warn!(
                        key = %redact_key(key),
                        error = %e,
                        "Ignoring undecodable distributed cache entry"
                    );
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(
                    key = %redact_key(key),
                    error = %e,
                    "Distributed cache lookup failed"
                );
            }
        }

        self.fallback.get(key).await
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.distributed.remove(key).await {
            warn!(
                key = %redact_key(key),
                error = %e,
                "Distributed cache removal failed"
            );
        }
        self.fallback.remove(key).await;
    }

    async fn insert(&self, key: String, object: Arc<CacheObject>) {
        if self.is_in_memory_only(&object) {
            debug!(key = %redact_key(&key), "Caching in memory only");
            self.insert_locally(key, object, FallbackReason::Policy).await;
            return;
        }

        let bytes = match object.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    key = %redact_key(&key),
                    error = %e,
                    "Cannot serialize cache object, falling back to in-memory cache"
                );
                self.insert_locally(key, object, FallbackReason::Serialization).await;
                return;
            }
        };

        match self.distributed.put(key.clone(), bytes).await {
            Ok(()) => {
                // Drop any local copy left by an earlier degraded write
                self.fallback.remove(&key).await;
            }
            Err(e) => {
                warn!(
                    key = %redact_key(&key),
                    error = %e,
                    "Distributed cache write failed, falling back to in-memory cache"
                );
                self.insert_locally(key, object, FallbackReason::Unavailable).await;
            }
        }
    }

    fn stop_eviction_task(&self) {
        self.fallback.stop_eviction_task();
    }

    fn is_eviction_task_running(&self) -> bool {
        self.fallback.is_eviction_task_running()
    }

    /// Covers the in-memory fallback only
    fn stats(&self) -> CacheStats {
        self.fallback.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::backing::AuthEvictionListeners;
    use crate::auth::subject::{Credential, Principal, Subject};
    use crate::config::AuthCacheConfig;
    use crate::distributed::InProcessDistributedCache;
    use std::time::Duration;
    use tracing_test::traced_test;

    struct Fixture {
        store: Arc<InProcessDistributedCache>,
        lifecycle: Arc<ProcessLifecycle>,
        cache: JCacheAuthCache,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InProcessDistributedCache::new());
        let lifecycle = Arc::new(ProcessLifecycle::ready());
        let config = AuthCacheConfig::new(4, 100, Duration::ZERO, true);
        let fallback = InMemoryAuthCache::new(&config, AuthEvictionListeners::new());
        let distributed: Arc<dyn DistributedCache> = store.clone();
        let cache = JCacheAuthCache::new(distributed, fallback, Arc::clone(&lifecycle));
        Fixture {
            store,
            lifecycle,
            cache,
        }
    }

    fn object(subject: Subject, key: &str) -> Arc<CacheObject> {
        let object = CacheObject::new(subject);
        object.add_lookup_key(key);
        Arc::new(object)
    }

    fn alice() -> Subject {
        Subject::new().with_principal(Principal::new("alice"))
    }

    #[tokio::test]
    async fn test_serializable_object_goes_to_distributed_store() {
        let f = fixture();
        f.cache.insert("k".to_string(), object(alice(), "k")).await;

        assert!(f.store.contains_key("k"));
        assert_eq!(f.cache.fallback().size(), 0);

        let found = f.cache.get("k").await.expect("distributed hit");
        assert_eq!(found.subject().as_ref(), &alice());
        assert_eq!(found.lookup_keys(), vec!["k".to_string()]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_serialization_failure_falls_back_to_memory() {
        let f = fixture();
        let local = alice().with_credential(Credential::InProcess("handle".to_string()));
        let inserted = object(local, "k");

        f.cache.insert("k".to_string(), Arc::clone(&inserted)).await;

        assert!(!f.store.contains_key("k"));
        let found = f.cache.get("k").await.expect("in-memory hit");
        assert!(Arc::ptr_eq(&found, &inserted));
        assert!(logs_contain("Cannot serialize cache object"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_undecodable_entry_is_a_miss() {
        let f = fixture();
        f.store
            .put("k".to_string(), vec![0xde, 0xad])
            .await
            .unwrap();

        assert!(f.cache.get("k").await.is_none());
        assert!(logs_contain("Ignoring undecodable distributed cache entry"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unavailable_store_degrades_to_memory() {
        let f = fixture();
        f.store.set_available(false);

        let inserted = object(alice(), "k");
        f.cache.insert("k".to_string(), Arc::clone(&inserted)).await;
        let found = f.cache.get("k").await.expect("in-memory hit");

        assert!(Arc::ptr_eq(&found, &inserted));
        assert!(logs_contain("Distributed cache write failed"));
        assert!(logs_contain("Distributed cache lookup failed"));
    }

    #[tokio::test]
    async fn test_in_memory_policy_bypasses_store() {
        let f = fixture();
        let policy: InMemoryPolicy = Arc::new(|object: &CacheObject| {
            object
                .subject()
                .primary_principal()
                .is_some_and(|principal| principal.name == "alice")
        });
        let cache = f.cache.with_in_memory_policy(policy);

        cache.insert("a".to_string(), object(alice(), "a")).await;
        let bob = Subject::new().with_principal(Principal::new("bob"));
        cache.insert("b".to_string(), object(bob, "b")).await;

        assert!(!f.store.contains_key("a"));
        assert!(f.store.contains_key("b"));
        assert!(cache.get("a").await.is_some());
    }

    #[tokio::test]
    async fn test_remove_clears_both_stores() {
        let f = fixture();
        f.cache.insert("d".to_string(), object(alice(), "d")).await;
        let local = alice().with_credential(Credential::InProcess("handle".to_string()));
        f.cache.insert("m".to_string(), object(local, "m")).await;

        f.cache.remove("d").await;
        f.cache.remove("m").await;

        assert!(f.store.is_empty());
        assert!(f.cache.get("d").await.is_none());
        assert!(f.cache.get("m").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_respects_lifecycle() {
        let store = Arc::new(InProcessDistributedCache::new());
        let lifecycle = Arc::new(ProcessLifecycle::new());
        let config = AuthCacheConfig::new(4, 100, Duration::ZERO, true);
        let distributed: Arc<dyn DistributedCache> = store.clone();
        let cache = JCacheAuthCache::new(
            distributed,
            InMemoryAuthCache::new(&config, AuthEvictionListeners::new()),
            Arc::clone(&lifecycle),
        );

        cache.insert("k".to_string(), object(alice(), "k")).await;

        cache.clear_all_entries(false).await;
        assert!(store.contains_key("k"), "starting process keeps shared entries");

        cache.clear_all_entries(true).await;
        assert!(store.is_empty(), "force clears shared entries");

        cache.insert("k".to_string(), object(alice(), "k")).await;
        lifecycle.mark_ready();
        cache.clear_all_entries(false).await;
        assert!(store.is_empty());

        cache.insert("k".to_string(), object(alice(), "k")).await;
        lifecycle.mark_stopping();
        cache.clear_all_entries(false).await;
        assert!(store.contains_key("k"), "stopping process keeps shared entries");
    }

    #[tokio::test]
    async fn test_clear_evicts_fallback_even_when_not_ready() {
        let f = fixture();
        f.lifecycle.mark_stopping();
        let local = alice().with_credential(Credential::InProcess("handle".to_string()));
        f.cache.insert("m".to_string(), object(local, "m")).await;

        f.cache.clear_all_entries(false).await;
        assert_eq!(f.cache.fallback().size(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_non_distributable_policy_skips_serialization() {
        let f = fixture();
        let cache = f.cache.with_in_memory_policy(non_distributable_policy());
        let local = alice().with_credential(Credential::InProcess("handle".to_string()));

        cache.insert("m".to_string(), object(local, "m")).await;
        cache.insert("d".to_string(), object(alice(), "d")).await;

        assert!(!f.store.contains_key("m"));
        assert!(f.store.contains_key("d"));
        assert!(cache.get("m").await.is_some());
        assert!(!logs_contain("Cannot serialize cache object"));
    }
}
