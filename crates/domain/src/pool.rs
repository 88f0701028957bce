use serde::{Deserialize, Serialize};
use std::fmt;

/// Which pool a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    Read,
    Write,
    Generic,
}

impl PoolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a single pool. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub pool_type: PoolType,
    pub total_connections: usize,
    pub idle_connections: usize,
    pub active_connections: usize,
    pub max_connections: usize,
    pub utilization_percent: f64,
    pub connection_errors: u64,
}

impl PoolStats {
    pub fn new(
        pool_type: PoolType,
        idle: usize,
        active: usize,
        max: usize,
        connection_errors: u64,
    ) -> Self {
        let utilization_percent = if max == 0 {
            0.0
        } else {
            (active as f64 / max as f64 * 100.0).clamp(0.0, 100.0)
        };
        Self {
            pool_type,
            total_connections: idle + active,
            idle_connections: idle,
            active_connections: active,
            max_connections: max,
            utilization_percent,
            connection_errors,
        }
    }
}

/// Stats for both pools owned by the pool manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolManagerStats {
    pub read: PoolStats,
    pub write: PoolStats,
}
