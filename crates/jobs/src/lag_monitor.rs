use quire_application::ports::ReplicaMonitor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodically re-measures replica lag so routing sees fresh values.
pub struct ReplicaLagMonitorJob {
    monitor: Arc<dyn ReplicaMonitor>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl ReplicaLagMonitorJob {
    pub fn new(monitor: Arc<dyn ReplicaMonitor>) -> Self {
        Self {
            monitor,
            interval_secs: 10,
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
            "Starting replica lag monitor job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("ReplicaLagMonitorJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let summary = self.monitor.refresh_replica_lags().await;
                        if summary.unreachable > 0 {
                            warn!(
                                checked = summary.checked,
                                unreachable = summary.unreachable,
                                "Some replicas could not report lag"
                            );
                        } else {
                            debug!(checked = summary.checked, "Replica lags refreshed");
                        }
                    }
                }
            }
        })
    }
}
