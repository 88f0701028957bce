use async_trait::async_trait;
use std::time::Duration;

/// Closes pooled connections that sat idle past a timeout.
#[async_trait]
pub trait ConnectionReclaimer: Send + Sync {
    async fn reclaim_idle(&self, idle_timeout: Duration) -> usize;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LagRefreshSummary {
    pub checked: usize,
    pub unreachable: usize,
}

/// Re-measures replication lag for every known replica.
#[async_trait]
pub trait ReplicaMonitor: Send + Sync {
    async fn refresh_replica_lags(&self) -> LagRefreshSummary;
}

/// Forgets rate-limit windows no request has touched for a full window.
#[async_trait]
pub trait RateLimitSweeper: Send + Sync {
    async fn sweep_stale_windows(&self) -> usize;
}

/// Drops expired entries from the in-process cache.
pub trait CacheSweeper: Send + Sync {
    fn sweep_expired(&self) -> usize;
}
