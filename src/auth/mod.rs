//! Authentication cache
//!
//! Caches authenticated [`Subject`]s under keys derived from the credentials
//! they were authenticated with, on top of the generational engine in
//! [`crate::cache`].

pub mod backing;
pub mod cache_object;
pub mod jcache;
pub mod keys;
pub mod management;
pub mod service;
pub mod subject;
pub mod validity;

pub use backing::{AuthCache, AuthEvictionListeners, InMemoryAuthCache};
pub use cache_object::CacheObject;
pub use jcache::{InMemoryPolicy, JCacheAuthCache, non_distributable_policy};
pub use keys::{
    BasicAuthCacheKeyProvider, CacheContext, CacheKeyProvider, CertificateCacheKeyProvider,
    CustomCacheKeyProvider, ProvidedKey, SsoTokenCacheKeyProvider,
};
pub use management::AuthCacheManagement;
pub use service::AuthCacheService;
pub use subject::{Credential, DEFAULT_REALM, Principal, Subject};
pub use validity::{CredentialsValidator, ExpirationValidator};
