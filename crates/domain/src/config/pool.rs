use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sizing shared by the read and write pools
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Connections created by prewarm and kept through idle sweeps (default: 2)
    #[serde(default = "default_min_connections")]
    pub min_connections: usize,

    /// Hard upper bound per pool (default: 10)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Idle time after which a connection may be closed, in seconds (default: 300)
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,

    /// How long callers wait for a connection, in milliseconds (default: 5000)
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_ms: u64,
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            idle_timeout_seconds: default_idle_timeout(),
            acquire_timeout_ms: default_acquire_timeout(),
        }
    }
}

fn default_min_connections() -> usize {
    2
}

fn default_max_connections() -> usize {
    10
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_acquire_timeout() -> u64 {
    5000
}
