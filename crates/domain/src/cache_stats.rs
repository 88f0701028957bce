use serde::Serialize;

/// Counters for the in-process tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
    pub max_size: usize,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_rate_of(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Counters for the two-tier cache manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheManagerStats {
    pub tier1: CacheStats,
    pub tier2_available: bool,
    pub tier2_hits: u64,
    pub tier2_misses: u64,
    pub tier2_errors: u64,
    pub total_misses: u64,
}
