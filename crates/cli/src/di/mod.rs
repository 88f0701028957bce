use crate::bootstrap::SqliteLayer;
use quire_application::ports::{
    CacheSweeper, ConnectionReclaimer, RateLimitSweeper, ReplicaMonitor,
};
use quire_domain::Config;
use quire_jobs::{
    CacheCompactionJob, IdleConnectionReaperJob, JobRunner, RateLimitSweepJob, ReplicaLagMonitorJob,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Register the maintenance jobs against the layer's components. All jobs
/// stop when `shutdown` is cancelled.
pub async fn start_jobs(
    config: &Config,
    layer: &SqliteLayer,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let reclaimer: Arc<dyn ConnectionReclaimer> = layer.pools().clone();
    let monitor: Arc<dyn ReplicaMonitor> = layer.isolator().clone();
    let sweeper: Arc<dyn CacheSweeper> = layer.cache().clone();
    let limiter: Arc<dyn RateLimitSweeper> = layer.limiter().clone();

    JobRunner::new()
        .with_idle_reaper(
            IdleConnectionReaperJob::new(reclaimer, config.pool.idle_timeout())
                .with_interval(config.jobs.idle_sweep_interval)
                .with_cancellation(shutdown.clone()),
        )
        .with_lag_monitor(
            ReplicaLagMonitorJob::new(monitor)
                .with_interval(config.jobs.lag_check_interval)
                .with_cancellation(shutdown.clone()),
        )
        .with_cache_compaction(
            CacheCompactionJob::new(sweeper)
                .with_interval(config.jobs.cache_compaction_interval)
                .with_cancellation(shutdown.clone()),
        )
        .with_rate_limit_sweep(
            RateLimitSweepJob::new(limiter)
                .with_interval(config.jobs.rate_limit_sweep_interval)
                .with_cancellation(shutdown),
        )
        .start()
        .await
}
