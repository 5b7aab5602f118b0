//! Generational LRU cache engine
//!
//! Entries live in one of three tables:
//!
//! - **primary**: most recently inserted or looked up
//! - **secondary**: survived one sweep without being touched
//! - **tertiary**: survived two sweeps, discarded on the next
//!
//! A sweep rotates the tables in O(1): tertiary is dropped (and reported to
//! eviction listeners), secondary becomes tertiary, primary becomes secondary
//! and a fresh primary is allocated. A lookup hit in secondary or tertiary
//! promotes the entry back to primary. Sweeps run when an insert finds the
//! cache over its entry limit and, when a timeout is configured, periodically
//! from a background task every `timeout / 2`.
//!
//! A lookup miss leaves an empty placeholder in primary. The placeholder
//! counts toward the entry limit and is replaced by the next insert for that
//! key.
//!
//! All cross-table operations run under a single mutex. Eviction listeners
//! are invoked after the lock is released, in the calling thread.

use std::collections::HashMap;
use std::hash::Hash;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::entry::Entry;
use super::listener::EvictionListeners;
use super::stats::CacheStats;
use crate::observability::metrics;

/// Sizing and timing for a generational cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Name used in logs and metric labels
    pub name: String,
    /// Minimum capacity allocated for a fresh primary table
    pub initial_size: usize,
    /// Entry limit across all generations. `0` or `usize::MAX` disables
    /// size-triggered eviction.
    pub max_entries: usize,
    /// Entry timeout. Background sweeps run every half timeout; zero disables
    /// them.
    pub timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "cache".to_string(),
            initial_size: 50,
            max_entries: 25_000,
            timeout: Duration::from_secs(600),
        }
    }
}

struct Generations<K, V> {
    primary: HashMap<K, Entry<V>>,
    secondary: HashMap<K, Entry<V>>,
    tertiary: HashMap<K, Entry<V>>,
    min_size: usize,
    entry_limit: usize,
    stats: CacheStats,
}

impl<K, V> Generations<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new(min_size: usize, entry_limit: usize) -> Self {
        Self {
            primary: HashMap::with_capacity(min_size),
            secondary: HashMap::with_capacity(min_size),
            tertiary: HashMap::with_capacity(min_size),
            min_size,
            entry_limit,
            stats: CacheStats::default(),
        }
    }

    fn len(&self) -> usize {
        self.primary.len() + self.secondary.len() + self.tertiary.len()
    }

    fn is_eviction_required(&self) -> bool {
        self.entry_limit != 0 && self.entry_limit != usize::MAX && self.len() > self.entry_limit
    }

    fn lookup(&mut self, key: &K) -> Option<V> {
        if let Some(entry) = self.primary.get_mut(key) {
            entry.touch();
            let value = entry.value.clone();
            self.record_lookup(value.is_some());
            return value;
        }

        let promoted = self
            .secondary
            .remove(key)
            .or_else(|| self.tertiary.remove(key));

        match promoted {
            Some(mut entry) => {
                entry.touch();
                let value = entry.value.clone();
                self.primary.insert(key.clone(), entry);
                self.stats.promotions += 1;
                self.record_lookup(value.is_some());
                value
            }
            None => {
                self.primary.insert(key.clone(), Entry::placeholder());
                self.record_lookup(false);
                None
            }
        }
    }

    fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
    }

    /// Write into primary, dropping any older copy of the key so it lives in
    /// exactly one generation. Returns the value that was replaced.
    fn store(&mut self, key: K, value: V) -> Option<V> {
        let replaced = self.primary.insert(key.clone(), Entry::new(value));
        let stale_secondary = self.secondary.remove(&key);
        let stale_tertiary = self.tertiary.remove(&key);
        [replaced, stale_secondary, stale_tertiary]
            .into_iter()
            .flatten()
            .find_map(|entry| entry.value)
    }

    fn take(&mut self, key: &K) -> Option<V> {
        [
            self.primary.remove(key),
            self.secondary.remove(key),
            self.tertiary.remove(key),
        ]
        .into_iter()
        .flatten()
        .find_map(|entry| entry.value)
    }

    fn rotate(&mut self) -> Vec<V> {
        let fresh = HashMap::with_capacity(self.min_size.max(self.primary.len()));
        let aging = mem::replace(&mut self.primary, fresh);
        let eligible = mem::replace(&mut self.secondary, aging);
        let discarded = mem::replace(&mut self.tertiary, eligible);

        let evicted: Vec<V> = discarded
            .into_values()
            .filter_map(|entry| entry.value)
            .collect();
        self.stats.sweeps += 1;
        self.stats.evictions += evicted.len() as u64;
        evicted
    }

    fn drain_all(&mut self) -> Vec<V> {
        let primary = mem::take(&mut self.primary);
        let secondary = mem::take(&mut self.secondary);
        self.tertiary.extend(primary);
        self.tertiary.extend(secondary);
        self.rotate()
    }
}

struct Shared<K, V> {
    name: String,
    state: Mutex<Generations<K, V>>,
    listeners: EvictionListeners<V>,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn evict_stale_entries(&self) {
        let (evicted, remaining) = {
            let mut state = self.state.lock();
            let evicted = state.rotate();
            (evicted, state.len())
        };
        debug!(
            cache = %self.name,
            evicted = evicted.len(),
            remaining,
            "Rotated cache generations"
        );
        self.report(&evicted);
    }

    fn report(&self, evicted: &[V]) {
        if evicted.is_empty() {
            return;
        }
        metrics::record_evictions(&self.name, evicted.len());
        self.listeners.notify(evicted);
    }
}

/// Three-generation LRU approximation with batch eviction
pub struct Cache<K, V> {
    shared: Arc<Shared<K, V>>,
    eviction_task: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with no eviction listeners
    pub fn new(config: CacheConfig) -> Self {
        Self::with_listeners(config, EvictionListeners::new())
    }

    /// Create a cache reporting evictions to `listeners`.
    ///
    /// If `config.timeout` is non-zero the background sweep is scheduled on
    /// the current tokio runtime. Outside a runtime the cache still works but
    /// only evicts under size pressure.
    pub fn with_listeners(config: CacheConfig, listeners: EvictionListeners<V>) -> Self {
        debug!(
            cache = %config.name,
            initial_size = config.initial_size,
            max_entries = config.max_entries,
            timeout_ms = config.timeout.as_millis() as u64,
            "Creating generational cache"
        );

        let shared = Arc::new(Shared {
            name: config.name.clone(),
            state: Mutex::new(Generations::new(config.initial_size, config.max_entries)),
            listeners,
        });

        let eviction_task = if config.timeout.is_zero() {
            None
        } else {
            Self::schedule_eviction(Arc::clone(&shared), config.timeout)
        };

        Self {
            shared,
            eviction_task: Mutex::new(eviction_task),
        }
    }

    fn schedule_eviction(shared: Arc<Shared<K, V>>, timeout: Duration) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(
                    cache = %shared.name,
                    "No tokio runtime available, background eviction disabled"
                );
                return None;
            }
        };

        let period = (timeout / 2).max(Duration::from_millis(1));
        Some(runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                shared.evict_stale_entries();
            }
        }))
    }

    /// Insert `value` under `key` into the primary generation.
    ///
    /// Generations are rotated first while the cache is over its entry limit.
    /// A replaced value is reported to listeners as a single-element batch.
    pub fn insert(&self, key: K, value: V) {
        let mut evicted = Vec::new();
        let replaced = {
            let mut state = self.shared.state.lock();
            while state.is_eviction_required() {
                evicted.push(state.rotate());
            }
            state.store(key, value)
        };

        for batch in &evicted {
            self.shared.report(batch);
        }
        if let Some(old) = replaced {
            self.shared.listeners.notify(std::slice::from_ref(&old));
        }
    }

    /// Look up `key`, promoting it to primary on a hit in an older
    /// generation. A miss leaves a placeholder in primary.
    pub fn get(&self, key: &K) -> Option<V> {
        self.shared.state.lock().lookup(key)
    }

    /// Remove `key` from every generation. Removing an absent key is a no-op.
    pub fn remove(&self, key: &K) {
        let removed = self.shared.state.lock().take(key);
        if let Some(value) = removed {
            if !self.shared.listeners.is_empty() {
                self.shared.listeners.notify(std::slice::from_ref(&value));
            }
        }
    }

    /// Rotate generations once, discarding tertiary
    pub fn evict_stale_entries(&self) {
        self.shared.evict_stale_entries();
    }

    /// Evict everything. Each live value is reported exactly once.
    pub fn clear_all_entries(&self) {
        let evicted = self.shared.state.lock().drain_all();
        debug!(
            cache = %self.shared.name,
            evicted = evicted.len(),
            "Cleared all cache entries"
        );
        self.shared.report(&evicted);
    }

    /// Cancel the background sweep. Safe to call repeatedly.
    pub fn stop_eviction_task(&self) {
        if let Some(task) = self.eviction_task.lock().take() {
            task.abort();
            debug!(cache = %self.shared.name, "Stopped background eviction");
        }
    }

    pub fn is_eviction_task_running(&self) -> bool {
        self.eviction_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Number of slots across all generations, placeholders included
    pub fn size(&self) -> usize {
        self.shared.state.lock().len()
    }

    /// Slot counts per generation: (primary, secondary, tertiary)
    pub fn generation_sizes(&self) -> (usize, usize, usize) {
        let state = self.shared.state.lock();
        (state.primary.len(), state.secondary.len(), state.tertiary.len())
    }

    pub fn listeners(&self) -> &EvictionListeners<V> {
        &self.shared.listeners
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.shared.state.lock();
        let mut stats = state.stats.clone();
        stats.entries = state.len() as u64;
        stats.hit_rate = CacheStats::calculate_hit_rate(stats.hits, stats.misses);
        stats
    }
}

impl<K, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        if let Some(task) = self.eviction_task.get_mut().take() {
            task.abort();
        }
    }
}
