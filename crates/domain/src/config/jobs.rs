use serde::{Deserialize, Serialize};

/// Background maintenance intervals
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Idle connection sweep interval in seconds (default: 60)
    #[serde(default = "default_idle_sweep_interval")]
    pub idle_sweep_interval: u64,

    /// Replica lag refresh interval in seconds (default: 10)
    #[serde(default = "default_lag_check_interval")]
    pub lag_check_interval: u64,

    /// Expired cache entry sweep interval in seconds (default: 120)
    #[serde(default = "default_cache_compaction_interval")]
    pub cache_compaction_interval: u64,

    /// Stale rate-limit window sweep interval in seconds (default: 300)
    #[serde(default = "default_rate_limit_sweep_interval")]
    pub rate_limit_sweep_interval: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            idle_sweep_interval: default_idle_sweep_interval(),
            lag_check_interval: default_lag_check_interval(),
            cache_compaction_interval: default_cache_compaction_interval(),
            rate_limit_sweep_interval: default_rate_limit_sweep_interval(),
        }
    }
}

fn default_idle_sweep_interval() -> u64 {
    60
}

fn default_lag_check_interval() -> u64 {
    10
}

fn default_cache_compaction_interval() -> u64 {
    120
}

fn default_rate_limit_sweep_interval() -> u64 {
    300
}
