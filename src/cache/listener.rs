//! Eviction notification
//!
//! Listeners are called synchronously with every batch of values that leaves
//! the cache: a whole generation on rotation, or a single value on explicit
//! removal or overwrite. A panicking listener is not caught.

use crate::registry::Registry;

/// Receives values evicted from a cache
pub trait EvictionListener<V>: Send + Sync {
    fn evicted(&self, values: &[V]);
}

impl<V, F> EvictionListener<V> for F
where
    F: Fn(&[V]) + Send + Sync,
{
    fn evicted(&self, values: &[V]) {
        self(values)
    }
}

/// Shared set of eviction listeners. A cache built from a clone sees
/// listeners registered after it was created.
pub type EvictionListeners<V> = Registry<dyn EvictionListener<V>>;

impl<V> Registry<dyn EvictionListener<V>> {
    /// Deliver a batch to every listener. Empty batches are dropped.
    pub fn notify(&self, values: &[V]) {
        if values.is_empty() {
            return;
        }
        for listener in self.snapshot() {
            listener.evicted(values);
        }
    }
}
