//! Distributed cache client contract
//!
//! The authentication cache can be backed by a store shared between
//! processes. Values cross the process boundary as opaque bytes; encoding and
//! decoding happen on the caller's side.
//!
//! [`InProcessDistributedCache`] implements the contract over a concurrent
//! map. It backs single-node deployments and tests, and can be switched
//! unavailable to exercise degraded paths. It holds at most `max_entries`
//! keys; writes of new keys beyond that are rejected and the caller falls
//! back to its own bounded memory tier.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributedCacheError {
    /// A value could not be encoded for the shared store
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A stored value could not be decoded, usually written by an
    /// incompatible peer
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    #[error("Distributed cache unavailable: {0}")]
    Unavailable(String),
}

/// Client for a key-value store shared between processes
#[async_trait]
pub trait DistributedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DistributedCacheError>;

    async fn put(&self, key: String, value: Vec<u8>) -> Result<(), DistributedCacheError>;

    /// Returns whether a value was present
    async fn remove(&self, key: &str) -> Result<bool, DistributedCacheError>;

    async fn remove_all(&self) -> Result<(), DistributedCacheError>;

    fn name(&self) -> &str {
        "distributed"
    }
}

/// Default key limit of [`InProcessDistributedCache`]
pub const DEFAULT_MAX_ENTRIES: usize = 25_000;

/// Distributed cache contract over a local concurrent map
pub struct InProcessDistributedCache {
    name: String,
    entries: DashMap<String, Vec<u8>>,
    max_entries: usize,
    available: AtomicBool,
}

impl InProcessDistributedCache {
    pub fn new() -> Self {
        Self::with_name("in-process")
    }

    pub fn with_name(name: &str) -> Self {
        Self::with_limit(name, DEFAULT_MAX_ENTRIES)
    }

    /// Concurrent writers may overshoot `max_entries` by at most one key each
    pub fn with_limit(name: &str, max_entries: usize) -> Self {
        Self {
            name: name.to_string(),
            entries: DashMap::new(),
            max_entries,
            available: AtomicBool::new(true),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Simulate losing or regaining the store
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        debug!(cache = %self.name, available, "Distributed cache availability changed");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn ensure_available(&self) -> Result<(), DistributedCacheError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DistributedCacheError::Unavailable(format!(
                "{} is not reachable",
                self.name
            )))
        }
    }
}

impl Default for InProcessDistributedCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DistributedCache for InProcessDistributedCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DistributedCacheError> {
        self.ensure_available()?;
        Ok(self.entries.get(key).map(|value| value.clone()))
    }

    async fn put(&self, key: String, value: Vec<u8>) -> Result<(), DistributedCacheError> {
        self.ensure_available()?;
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            return Err(DistributedCacheError::Unavailable(format!(
                "{} is full ({} entries)",
                self.name, self.max_entries
            )));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, DistributedCacheError> {
        self.ensure_available()?;
        Ok(self.entries.remove(key).is_some())
    }

    async fn remove_all(&self) -> Result<(), DistributedCacheError> {
        self.ensure_available()?;
        self.entries.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
