//! Cache metrics
//!
//! Counters are emitted through the `metrics` facade. The library installs no
//! recorder; without one every call is a no-op. Cache keys never appear in
//! labels.

use metrics::counter;

/// Where a lookup was answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    Distributed,
}

impl CacheTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Memory => "memory",
            CacheTier::Distributed => "distributed",
        }
    }
}

/// Why a value went to memory instead of the distributed tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    Policy,
    Serialization,
    Unavailable,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Policy => "policy",
            FallbackReason::Serialization => "serialization",
            FallbackReason::Unavailable => "unavailable",
        }
    }
}

pub fn record_hit(tier: CacheTier) {
    counter!("authcache_hits_total", "tier" => tier.as_str()).increment(1);
}

pub fn record_miss() {
    counter!("authcache_misses_total").increment(1);
}

pub fn record_evictions(cache: &str, count: usize) {
    counter!("authcache_evictions_total", "cache" => cache.to_string()).increment(count as u64);
}

pub fn record_fallback(reason: FallbackReason) {
    counter!("authcache_distributed_fallbacks_total", "reason" => reason.as_str()).increment(1);
}

pub fn record_invalid_subject() {
    counter!("authcache_invalid_subjects_total").increment(1);
}
