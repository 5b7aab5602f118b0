/// Cache statistics for monitoring and debugging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Total number of lookup hits (any generation)
    pub hits: u64,
    /// Total number of lookup misses
    pub misses: u64,
    /// Hits that promoted an entry out of secondary or tertiary
    pub promotions: u64,
    /// Current number of slots across all generations, placeholders included
    pub entries: u64,
    /// Hit rate as percentage (0.0 - 100.0)
    pub hit_rate: f64,
    /// Values reported to listeners by generation rotation
    pub evictions: u64,
    /// Number of generation rotations performed
    pub sweeps: u64,
}

impl CacheStats {
    /// Calculate hit rate from hits and misses
    pub fn calculate_hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}
