//! Runtime-updatable collections of collaborators
//!
//! Both eviction listeners and cache key providers can be registered and
//! unregistered while the cache is in use. Cloning a [`Registry`] shares it.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

/// Handle returned on registration, used to unregister later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct Registry<T: ?Sized> {
    entries: Arc<RwLock<Vec<(RegistrationId, Arc<T>)>>>,
}

impl<T: ?Sized> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, item: Arc<T>) -> RegistrationId {
        let id = RegistrationId::new();
        self.entries.write().push((id, item));
        id
    }

    /// Returns `false` when `id` was not registered
    pub fn unregister(&self, id: RegistrationId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(registered, _)| *registered != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Registration-ordered copy, so callers never hold the lock while
    /// calling into a collaborator
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries
            .read()
            .iter()
            .map(|(_, item)| Arc::clone(item))
            .collect()
    }
}
