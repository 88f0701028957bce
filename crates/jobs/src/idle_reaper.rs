use quire_application::ports::ConnectionReclaimer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically closes pooled connections idle past `idle_timeout`.
pub struct IdleConnectionReaperJob {
    pools: Arc<dyn ConnectionReclaimer>,
    idle_timeout: Duration,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl IdleConnectionReaperJob {
    pub fn new(pools: Arc<dyn ConnectionReclaimer>, idle_timeout: Duration) -> Self {
        Self {
            pools,
            idle_timeout,
            interval_secs: 60,
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
            idle_timeout_secs = self.idle_timeout.as_secs(),
            "Starting idle connection reaper job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("IdleConnectionReaperJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let closed = self.pools.reclaim_idle(self.idle_timeout).await;
                        if closed > 0 {
                            info!(closed, "Idle connections reclaimed");
                        } else {
                            debug!("No idle connections to reclaim");
                        }
                    }
                }
            }
        })
    }
}
