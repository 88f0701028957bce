use quire_application::ports::RateLimitSweeper;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically forgets rate-limit windows of users who stopped sending
/// requests, so the store does not grow with every user ever seen.
pub struct RateLimitSweepJob {
    limiter: Arc<dyn RateLimitSweeper>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl RateLimitSweepJob {
    pub fn new(limiter: Arc<dyn RateLimitSweeper>) -> Self {
        Self {
            limiter,
            interval_secs: 300,
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
            "Starting rate limit sweep job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("RateLimitSweepJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let removed = self.limiter.sweep_stale_windows().await;
                        debug!(removed, "Rate limit sweep completed");
                    }
                }
            }
        })
    }
}
