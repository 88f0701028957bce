use serde::{Deserialize, Serialize};
use std::time::Duration;

/// In-process cache tier sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum number of entries in tier 1 (default: 10000)
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// TTL applied when a caller does not pass one, in seconds (default: 300)
    #[serde(default = "default_ttl")]
    pub default_ttl_seconds: u64,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            default_ttl_seconds: default_ttl(),
        }
    }
}

fn default_max_size() -> usize {
    10_000
}

fn default_ttl() -> u64 {
    300
}
