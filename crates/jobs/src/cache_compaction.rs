use quire_application::ports::CacheSweeper;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically drops expired entries from the in-process cache tier so
/// they stop holding capacity before anyone reads them again.
pub struct CacheCompactionJob {
    cache: Arc<dyn CacheSweeper>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl CacheCompactionJob {
    pub fn new(cache: Arc<dyn CacheSweeper>) -> Self {
        Self {
            cache,
            interval_secs: 120,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            interval_secs = self.interval_secs,
            "Starting cache compaction job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("CacheCompactionJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = self.cache.sweep_expired();
                        debug!(removed, "Cache compaction completed");
                    }
                }
            }
        })
    }
}
