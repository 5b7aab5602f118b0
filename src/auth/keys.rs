//! Cache key derivation
//!
//! A subject is inserted once per key produced by the registered
//! [`CacheKeyProvider`]s. Keys derived from secrets only ever contain a
//! SHA-256 digest of the secret.

use std::collections::BTreeSet;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::subject::Subject;
use crate::config::AuthCacheConfig;

/// Everything a key provider may derive a key from
#[derive(Debug, Clone)]
pub struct CacheContext {
    config: Arc<AuthCacheConfig>,
    subject: Arc<Subject>,
    user_id: Option<String>,
    password: Option<String>,
    certificates: Option<Vec<Vec<u8>>>,
}

impl CacheContext {
    pub fn new(config: Arc<AuthCacheConfig>, subject: Arc<Subject>) -> Self {
        Self {
            config,
            subject,
            user_id: None,
            password: None,
            certificates: None,
        }
    }

    pub fn with_password(mut self, user_id: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.password = Some(password.into());
        self
    }

    /// `chain` holds DER-encoded certificates, leaf first
    pub fn with_certificates(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.certificates = Some(chain);
        self
    }

    pub fn config(&self) -> &AuthCacheConfig {
        &self.config
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn certificates(&self) -> Option<&[Vec<u8>]> {
        self.certificates.as_deref()
    }
}

/// Result of asking a provider for keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvidedKey {
    None,
    Single(String),
    Set(BTreeSet<String>),
}

impl ProvidedKey {
    pub fn into_keys(self) -> Vec<String> {
        match self {
            ProvidedKey::None => Vec::new(),
            ProvidedKey::Single(key) => vec![key],
            ProvidedKey::Set(keys) => keys.into_iter().collect(),
        }
    }
}

impl From<Option<String>> for ProvidedKey {
    fn from(key: Option<String>) -> Self {
        key.map_or(ProvidedKey::None, ProvidedKey::Single)
    }
}

/// Computes cache keys for a subject being inserted
pub trait CacheKeyProvider: Send + Sync {
    fn provide_key(&self, context: &CacheContext) -> ProvidedKey;

    fn name(&self) -> &str;
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// `{realm}:{user_id}:{sha256(password)}` when basic auth lookup is allowed
#[derive(Debug, Default)]
pub struct BasicAuthCacheKeyProvider;

impl BasicAuthCacheKeyProvider {
    pub fn key_for(realm: &str, user_id: &str, password: &str) -> String {
        format!("{realm}:{user_id}:{}", sha256_hex(password.as_bytes()))
    }
}

impl CacheKeyProvider for BasicAuthCacheKeyProvider {
    fn provide_key(&self, context: &CacheContext) -> ProvidedKey {
        if !context.config().allow_basic_auth_lookup() {
            return ProvidedKey::None;
        }
        match (context.user_id(), context.password()) {
            (Some(user_id), Some(password)) => ProvidedKey::Single(Self::key_for(
                context.subject().realm(),
                user_id,
                password,
            )),
            _ => ProvidedKey::None,
        }
    }

    fn name(&self) -> &str {
        "basic-auth"
    }
}

/// `cert:{sha256(chain)}` over the concatenated DER encodings
#[derive(Debug, Default)]
pub struct CertificateCacheKeyProvider;

impl CertificateCacheKeyProvider {
    pub fn key_for(chain: &[Vec<u8>]) -> String {
        let mut hasher = Sha256::new();
        for certificate in chain {
            hasher.update(certificate);
        }
        format!("cert:{}", hex::encode(hasher.finalize()))
    }
}

impl CacheKeyProvider for CertificateCacheKeyProvider {
    fn provide_key(&self, context: &CacheContext) -> ProvidedKey {
        match context.certificates() {
            Some(chain) if !chain.is_empty() => ProvidedKey::Single(Self::key_for(chain)),
            _ => ProvidedKey::None,
        }
    }

    fn name(&self) -> &str {
        "certificate"
    }
}

/// `sso:{sha256(token)}` for every SSO token on the subject
#[derive(Debug, Default)]
pub struct SsoTokenCacheKeyProvider;

impl SsoTokenCacheKeyProvider {
    pub fn key_for(token: &[u8]) -> String {
        format!("sso:{}", sha256_hex(token))
    }
}

impl CacheKeyProvider for SsoTokenCacheKeyProvider {
    fn provide_key(&self, context: &CacheContext) -> ProvidedKey {
        let mut keys: BTreeSet<String> = context.subject().sso_tokens().map(Self::key_for).collect();
        match keys.len() {
            0 => ProvidedKey::None,
            1 => keys.pop_first().map_or(ProvidedKey::None, ProvidedKey::Single),
            _ => ProvidedKey::Set(keys),
        }
    }

    fn name(&self) -> &str {
        "sso-token"
    }
}

/// The subject's custom cache key, unchanged
#[derive(Debug, Default)]
pub struct CustomCacheKeyProvider;

impl CacheKeyProvider for CustomCacheKeyProvider {
    fn provide_key(&self, context: &CacheContext) -> ProvidedKey {
        context
            .subject()
            .custom_cache_key()
            .map(str::to_string)
            .into()
    }

    fn name(&self) -> &str {
        "custom"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::subject::{Credential, Principal};
    use std::time::Duration;

    fn context(subject: Subject, allow_basic: bool) -> CacheContext {
        let config = AuthCacheConfig::new(50, 25_000, Duration::from_secs(600), allow_basic);
        CacheContext::new(Arc::new(config), Arc::new(subject))
    }

    #[test]
    fn test_basic_auth_key() {
        let subject = Subject::new().with_principal(Principal::new("alice"));
        let ctx = context(subject, true).with_password("alice", "test");

        // sha256("test")
        assert_eq!(
            BasicAuthCacheKeyProvider.provide_key(&ctx),
            ProvidedKey::Single(
                "defaultRealm:alice:9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_basic_auth_key_uses_principal_realm() {
        let subject = Subject::new().with_principal(Principal::with_realm("alice", "corp"));
        let ctx = context(subject, true).with_password("alice", "test");

        match BasicAuthCacheKeyProvider.provide_key(&ctx) {
            ProvidedKey::Single(key) => assert!(key.starts_with("corp:alice:")),
            other => panic!("unexpected key {other:?}"),
        }
    }

    #[test]
    fn test_basic_auth_key_disabled() {
        let ctx = context(Subject::new(), false).with_password("alice", "test");
        assert_eq!(BasicAuthCacheKeyProvider.provide_key(&ctx), ProvidedKey::None);

        let ctx = context(Subject::new(), true);
        assert_eq!(BasicAuthCacheKeyProvider.provide_key(&ctx), ProvidedKey::None);
    }

    #[test]
    fn test_certificate_key_is_stable() {
        let chain = vec![vec![1u8, 2, 3], vec![4u8, 5]];
        let ctx = context(Subject::new(), true).with_certificates(chain.clone());

        let expected = CertificateCacheKeyProvider::key_for(&[vec![1u8, 2, 3, 4, 5]]);
        assert_eq!(
            CertificateCacheKeyProvider.provide_key(&ctx),
            ProvidedKey::Single(expected)
        );
        assert_eq!(
            CertificateCacheKeyProvider::key_for(&chain),
            CertificateCacheKeyProvider::key_for(&chain)
        );

        let ctx = context(Subject::new(), true).with_certificates(Vec::new());
        assert_eq!(CertificateCacheKeyProvider.provide_key(&ctx), ProvidedKey::None);
    }

    #[test]
    fn test_sso_token_keys() {
        let single = Subject::new().with_credential(Credential::SsoToken(b"token".to_vec()));
        assert_eq!(
            SsoTokenCacheKeyProvider.provide_key(&context(single, true)),
            ProvidedKey::Single(SsoTokenCacheKeyProvider::key_for(b"token"))
        );

        let several = Subject::new()
            .with_credential(Credential::SsoToken(b"a".to_vec()))
            .with_credential(Credential::SsoToken(b"b".to_vec()));
        match SsoTokenCacheKeyProvider.provide_key(&context(several, true)) {
            ProvidedKey::Set(keys) => {
                assert_eq!(keys.len(), 2);
                assert!(keys.iter().all(|key| key.starts_with("sso:")));
            }
            other => panic!("unexpected key {other:?}"),
        }

        assert_eq!(
            SsoTokenCacheKeyProvider.provide_key(&context(Subject::new(), true)),
            ProvidedKey::None
        );
    }

    #[test]
    fn test_custom_key_verbatim() {
        let subject = Subject::new().with_credential(Credential::CustomCacheKey("my-key".to_string()));
        assert_eq!(
            CustomCacheKeyProvider.provide_key(&context(subject, true)),
            ProvidedKey::Single("my-key".to_string())
        );
    }

    #[test]
    fn test_into_keys() {
        assert!(ProvidedKey::None.into_keys().is_empty());
        assert_eq!(ProvidedKey::Single("a".to_string()).into_keys(), vec!["a"]);
        let set: BTreeSet<String> = ["b".to_string(), "a".to_string()].into();
        assert_eq!(ProvidedKey::Set(set).into_keys(), vec!["a", "b"]);
    }
}
