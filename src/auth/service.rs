//! Authentication cache service
//!
//! Front door of the cache. A subject is inserted once per key the
//! registered [`CacheKeyProvider`]s derive for it, all keys pointing at one
//! shared [`CacheObject`]. Lookups re-validate the cached subject and evict it
//! under every key once it is no longer valid.
//!
//! The backing [`AuthCache`] is rebuilt on every configuration change and
//! whenever a distributed store is bound or unbound. Entries held by the
//! previous backing cache are dropped.

use std::sync::Arc;

use garde::Validate;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::backing::{AuthCache, AuthEvictionListeners, InMemoryAuthCache};
use super::cache_object::CacheObject;
use super::jcache::{InMemoryPolicy, JCacheAuthCache};
use super::keys::{
    BasicAuthCacheKeyProvider, CacheContext, CacheKeyProvider, CertificateCacheKeyProvider,
    CustomCacheKeyProvider, SsoTokenCacheKeyProvider,
};
use super::subject::Subject;
use super::validity::{CredentialsValidator, ExpirationValidator};
use crate::cache::{CacheStats, EvictionListener};
use crate::config::{AuthCacheConfig, AuthCacheSettings};
use crate::distributed::DistributedCache;
use crate::error::AuthCacheError;
use crate::lifecycle::ProcessLifecycle;
use crate::logging::redact_key;
use crate::observability::metrics;
use crate::registry::{RegistrationId, Registry};

/// Configuration, distributed binding and the backing cache built from
/// them. Replaced as a whole under one write lock.
struct ActiveCache {
    config: Arc<AuthCacheConfig>,
    distributed: Option<Arc<dyn DistributedCache>>,
    cache: Arc<dyn AuthCache>,
}

enum Reconfiguration {
    Config(AuthCacheConfig),
    Bind(Arc<dyn DistributedCache>),
    Unbind,
}

pub struct AuthCacheService {
    active: RwLock<ActiveCache>,
    lifecycle: Arc<ProcessLifecycle>,
    listeners: AuthEvictionListeners,
    key_providers: Registry<dyn CacheKeyProvider>,
    validator: Arc<dyn CredentialsValidator>,
    in_memory_policies: Vec<InMemoryPolicy>,
}

impl AuthCacheService {
    /// Service backed by process memory, with no key providers registered
    pub fn new(config: AuthCacheConfig, lifecycle: Arc<ProcessLifecycle>) -> Self {
        let config = Arc::new(config);
        let listeners = AuthEvictionListeners::new();
        let cache: Arc<dyn AuthCache> = Arc::new(InMemoryAuthCache::new(&config, listeners.clone()));

        Self {
            active: RwLock::new(ActiveCache {
                config,
                distributed: None,
                cache,
            }),
            lifecycle,
            listeners,
            key_providers: Registry::new(),
            validator: Arc::new(ExpirationValidator),
            in_memory_policies: Vec::new(),
        }
    }

    /// Register the basic auth, certificate, SSO token and custom key providers
    pub fn with_default_providers(self) -> Self {
        self.register_key_provider(Arc::new(BasicAuthCacheKeyProvider));
        self.register_key_provider(Arc::new(CertificateCacheKeyProvider));
        self.register_key_provider(Arc::new(SsoTokenCacheKeyProvider));
        self.register_key_provider(Arc::new(CustomCacheKeyProvider));
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn CredentialsValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Keep matching objects out of any distributed store bound later
    pub fn with_in_memory_policy(mut self, policy: InMemoryPolicy) -> Self {
        self.in_memory_policies.push(policy);
        self
    }

    pub fn lifecycle(&self) -> &Arc<ProcessLifecycle> {
        &self.lifecycle
    }

    /// Apply initial configuration properties
    pub async fn activate(&self, settings: &AuthCacheSettings) -> Result<(), AuthCacheError> {
        settings.validate()?;
        self.reconfigure(Reconfiguration::Config(AuthCacheConfig::from(settings)))
            .await;
        Ok(())
    }

    /// Apply changed configuration properties
    pub async fn modified(&self, settings: &AuthCacheSettings) -> Result<(), AuthCacheError> {
        settings.validate()?;
        debug!(?settings, "Authentication cache configuration modified");
        self.reconfigure(Reconfiguration::Config(AuthCacheConfig::from(settings)))
            .await;
        Ok(())
    }

    /// Stop background eviction of the current backing cache
    pub async fn deactivate(&self) {
        self.active.read().await.cache.stop_eviction_task();
        info!("Authentication cache deactivated");
    }

    /// Rebuild the backing cache. The current state is read and replaced
    /// under the same write lock, so concurrent changes apply in order.
    async fn reconfigure(&self, change: Reconfiguration) {
        let mut active = self.active.write().await;

        let (config, distributed) = match change {
            Reconfiguration::Config(config) => (Arc::new(config), active.distributed.clone()),
            Reconfiguration::Bind(distributed) => {
                info!(cache = %distributed.name(), "Binding distributed cache");
                (Arc::clone(&active.config), Some(distributed))
            }
            Reconfiguration::Unbind => match active.distributed.take() {
                Some(previous) => {
                    info!(cache = %previous.name(), "Unbinding distributed cache");
                    (Arc::clone(&active.config), None)
                }
                None => return,
            },
        };

        let cache = self.build_cache(&config, distributed.clone());
        active.cache.stop_eviction_task();
        *active = ActiveCache {
            config: Arc::clone(&config),
            distributed,
            cache,
        };

        info!(
            initial_size = config.initial_size(),
            max_size = config.max_size(),
            timeout_ms = config.timeout().as_millis() as u64,
            allow_basic_auth_lookup = config.allow_basic_auth_lookup(),
            distributed = active.distributed.is_some(),
            "Authentication cache configured"
        );
    }

    fn build_cache(
        &self,
        config: &AuthCacheConfig,
        distributed: Option<Arc<dyn DistributedCache>>,
    ) -> Arc<dyn AuthCache> {
        let in_memory = InMemoryAuthCache::new(config, self.listeners.clone());
        match distributed {
            Some(distributed) => Arc::new(
                JCacheAuthCache::new(distributed, in_memory, Arc::clone(&self.lifecycle))
                    .with_in_memory_policies(self.in_memory_policies.iter().cloned()),
            ),
            None => Arc::new(in_memory),
        }
    }

    async fn current(&self) -> (Arc<AuthCacheConfig>, Arc<dyn AuthCache>) {
        let active = self.active.read().await;
        (Arc::clone(&active.config), Arc::clone(&active.cache))
    }

    /// Bind a distributed store and rebuild the backing cache around it
    pub async fn set_distributed_cache(&self, distributed: Arc<dyn DistributedCache>) {
        self.reconfigure(Reconfiguration::Bind(distributed)).await;
    }

    /// Unbind the distributed store and fall back to process memory
    pub async fn unset_distributed_cache(&self) {
        self.reconfigure(Reconfiguration::Unbind).await;
    }

    pub async fn is_distributed(&self) -> bool {
        self.active.read().await.distributed.is_some()
    }

    pub async fn insert(&self, subject: Subject) -> Arc<CacheObject> {
        self.insert_with(subject, |context| context).await
    }

    pub async fn insert_with_password(
        &self,
        subject: Subject,
        user_id: &str,
        password: &str,
    ) -> Arc<CacheObject> {
        self.insert_with(subject, |context| context.with_password(user_id, password))
            .await
    }

    /// `chain` holds DER-encoded certificates, leaf first
    pub async fn insert_with_certificates(
        &self,
        subject: Subject,
        chain: Vec<Vec<u8>>,
    ) -> Arc<CacheObject> {
        self.insert_with(subject, |context| context.with_certificates(chain))
            .await
    }

    async fn insert_with<F>(&self, subject: Subject, extend: F) -> Arc<CacheObject>
    where
        F: FnOnce(CacheContext) -> CacheContext,
    {
        let (config, cache) = self.current().await;
        let subject = Arc::new(subject);
        let object = Arc::new(CacheObject::from_shared(Arc::clone(&subject)));
        let context = extend(CacheContext::new(config, subject));

        // Register every key before the first write so each stored copy
        // carries the complete key list
        for provider in self.key_providers.snapshot() {
            for key in provider.provide_key(&context).into_keys() {
                object.add_lookup_key(key);
            }
        }

        let keys = object.lookup_keys();
        if keys.is_empty() {
            debug!("No cache key provided for subject, not cached");
        }
        for key in keys {
            debug!(key = %redact_key(&key), "Caching subject");
            cache.insert(key, Arc::clone(&object)).await;
        }

        object
    }

    /// Cached subject for `key` if it is still valid.
    ///
    /// An invalid subject is removed under all of its keys.
    pub async fn get_subject(&self, key: &str) -> Option<Arc<Subject>> {
        let (_, cache) = self.current().await;
        let object = cache.get(key).await?;

        if self.validator.is_subject_valid(object.subject()) {
            return Some(Arc::clone(object.subject()));
        }

        metrics::record_invalid_subject();
        debug!(key = %redact_key(key), "Cached subject is no longer valid, evicting");
        Self::remove_object(cache.as_ref(), key, &object).await;
        None
    }

    /// Remove the object cached under `key` from every key it was cached under
    pub async fn remove(&self, key: &str) {
        let (_, cache) = self.current().await;
        if let Some(object) = cache.get(key).await {
            Self::remove_object(cache.as_ref(), key, &object).await;
        }
    }

    async fn remove_object(cache: &dyn AuthCache, key: &str, object: &CacheObject) {
        if !object.has_lookup_key(key) {
            cache.remove(key).await;
        }
        for key in object.lookup_keys() {
            cache.remove(&key).await;
        }
    }

    /// Evict everything from the local tier. Shared storage is cleared only
    /// while the process is ready.
    pub async fn remove_all_entries(&self) {
        let (_, cache) = self.current().await;
        cache.clear_all_entries(false).await;
    }

    /// Listeners apply to the current and all future backing caches
    pub fn register_eviction_listener(
        &self,
        listener: Arc<dyn EvictionListener<Arc<CacheObject>>>,
    ) -> RegistrationId {
        self.listeners.register(listener)
    }

    pub fn unregister_eviction_listener(&self, id: RegistrationId) -> bool {
        self.listeners.unregister(id)
    }

    pub fn register_key_provider(&self, provider: Arc<dyn CacheKeyProvider>) -> RegistrationId {
        debug!(provider = provider.name(), "Registering cache key provider");
        self.key_providers.register(provider)
    }

    pub fn unregister_key_provider(&self, id: RegistrationId) -> bool {
        self.key_providers.unregister(id)
    }

    pub async fn config(&self) -> Arc<AuthCacheConfig> {
        Arc::clone(&self.active.read().await.config)
    }

    pub async fn stats(&self) -> CacheStats {
        self.active.read().await.cache.stats()
    }

    pub async fn is_eviction_task_running(&self) -> bool {
        self.active.read().await.cache.is_eviction_task_running()
    }
}
