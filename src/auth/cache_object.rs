//! Cached payload shared by every key a subject was inserted under

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::subject::Subject;
use crate::distributed::DistributedCacheError;

/// A subject and the keys it can be found under.
///
/// One instance is shared through `Arc` by all cache entries created for a
/// subject, so removing it means removing every lookup key.
#[derive(Debug)]
pub struct CacheObject {
    subject: Arc<Subject>,
    lookup_keys: RwLock<Vec<String>>,
}

#[derive(Serialize)]
struct EncodedObject<'a> {
    subject: &'a Subject,
    lookup_keys: &'a [String],
}

#[derive(Deserialize)]
struct DecodedObject {
    subject: Subject,
    lookup_keys: Vec<String>,
}

impl CacheObject {
    pub fn new(subject: Subject) -> Self {
        Self::from_shared(Arc::new(subject))
    }

    pub fn from_shared(subject: Arc<Subject>) -> Self {
        Self {
            subject,
            lookup_keys: RwLock::new(Vec::new()),
        }
    }

    pub fn subject(&self) -> &Arc<Subject> {
        &self.subject
    }

    /// Record `key` as a lookup key. Returns `false` if it was already known.
    pub fn add_lookup_key(&self, key: impl Into<String>) -> bool {
        let key = key.into();
        let mut keys = self.lookup_keys.write();
        if keys.contains(&key) {
            return false;
        }
        keys.push(key);
        true
    }

    /// Lookup keys in registration order
    pub fn lookup_keys(&self) -> Vec<String> {
        self.lookup_keys.read().clone()
    }

    pub fn has_lookup_key(&self, key: &str) -> bool {
        self.lookup_keys.read().iter().any(|known| known == key)
    }

    /// Encode for a distributed store
    pub fn to_bytes(&self) -> Result<Vec<u8>, DistributedCacheError> {
        let keys = self.lookup_keys.read();
        let encoded = EncodedObject {
            subject: &self.subject,
            lookup_keys: &keys,
        };
        bincode::serialize(&encoded)
            .map_err(|e| DistributedCacheError::Serialization(e.to_string()))
    }

    /// Decode a value read from a distributed store
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DistributedCacheError> {
        let decoded: DecodedObject = bincode::deserialize(bytes)
            .map_err(|e| DistributedCacheError::Deserialization(e.to_string()))?;
        Ok(Self {
            subject: Arc::new(decoded.subject),
            lookup_keys: RwLock::new(decoded.lookup_keys),
        })
    }
}
