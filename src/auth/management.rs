use async_trait::async_trait;
use tracing::info;

use super::service::AuthCacheService;
use crate::cache::CacheStats;

/// Operator controls for the authentication cache
#[async_trait]
pub trait AuthCacheManagement: Send + Sync {
    /// Drop every cached subject
    async fn flush(&self);

    /// Statistics of the in-memory tier
    async fn stats(&self) -> CacheStats;
}

#[async_trait]
impl AuthCacheManagement for AuthCacheService {
    async fn flush(&self) {
        info!("Flushing authentication cache");
        self.remove_all_entries().await;
    }

    async fn stats(&self) -> CacheStats {
        AuthCacheService::stats(self).await
    }
}
