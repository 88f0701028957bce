use crate::{CacheCompactionJob, IdleConnectionReaperJob, RateLimitSweepJob, ReplicaLagMonitorJob};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Central orchestrator for all background jobs.
///
/// Use the builder pattern to register jobs, then call `.start()` once.
///
/// # Example
///
/// ```rust,ignore
/// JobRunner::new()
///     .with_idle_reaper(IdleConnectionReaperJob::new(pools, idle_timeout))
///     .with_lag_monitor(ReplicaLagMonitorJob::new(isolator))
///     .start()
///     .await;
/// ```
pub struct JobRunner {
    idle_reaper: Option<IdleConnectionReaperJob>,
    lag_monitor: Option<ReplicaLagMonitorJob>,
    cache_compaction: Option<CacheCompactionJob>,
    rate_limit_sweep: Option<RateLimitSweepJob>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            idle_reaper: None,
            lag_monitor: None,
            cache_compaction: None,
            rate_limit_sweep: None,
        }
    }

    pub fn with_idle_reaper(mut self, job: IdleConnectionReaperJob) -> Self {
        self.idle_reaper = Some(job);
        self
    }

    pub fn with_lag_monitor(mut self, job: ReplicaLagMonitorJob) -> Self {
        self.lag_monitor = Some(job);
        self
    }

    pub fn with_cache_compaction(mut self, job: CacheCompactionJob) -> Self {
        self.cache_compaction = Some(job);
        self
    }

    pub fn with_rate_limit_sweep(mut self, job: RateLimitSweepJob) -> Self {
        self.rate_limit_sweep = Some(job);
        self
    }

    /// Start all registered background jobs. The handles finish once each
    /// job's cancellation token fires.
    pub async fn start(self) -> Vec<JoinHandle<()>> {
        info!("Starting background job runner");
        let mut handles = Vec::with_capacity(4);

        if let Some(job) = self.idle_reaper {
            handles.push(Arc::new(job).start().await);
        }

        if let Some(job) = self.lag_monitor {
            handles.push(Arc::new(job).start().await);
        }

        if let Some(job) = self.cache_compaction {
            handles.push(Arc::new(job).start().await);
        }

        if let Some(job) = self.rate_limit_sweep {
            handles.push(Arc::new(job).start().await);
        }

        info!(jobs = handles.len(), "All background jobs started");
        handles
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
