use super::classifier::classify;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashSet;
use futures::future::join_all;
use quire_application::ports::{LagChecker, LagRefreshSummary, ReplicaMonitor};
use quire_domain::config::ReplicaConfig;
use quire_domain::{
    Query, QueryKind, QueryPriority, ReplicaInfo, ReplicaStatus, RouteReason, RouteTarget,
    TargetType,
};
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Routes statements to the primary or to the least-lagged healthy replica.
///
/// The replica list is swapped atomically, so routing never waits on a
/// lag refresh.
pub struct WorkloadIsolator {
    primary_host: String,
    primary_port: u16,
    max_replica_lag: f64,
    replicas: ArcSwap<Vec<ReplicaInfo>>,
    lag_checker: Option<Arc<dyn LagChecker>>,
    /// Replicas the lag refresh itself marked unhealthy.
    lag_failures: DashSet<String, FxBuildHasher>,
}

impl WorkloadIsolator {
    pub fn new(
        primary_host: impl Into<String>,
        primary_port: u16,
        replicas: Vec<ReplicaInfo>,
        max_replica_lag: f64,
    ) -> Self {
        Self {
            primary_host: primary_host.into(),
            primary_port,
            max_replica_lag,
            replicas: ArcSwap::from_pointee(replicas),
            lag_checker: None,
            lag_failures: DashSet::with_hasher(FxBuildHasher),
        }
    }

    pub fn from_config(config: &ReplicaConfig) -> Self {
        let replicas: Vec<ReplicaInfo> = config.servers.iter().map(|s| s.to_info()).collect();
        info!(
            primary = %format!("{}:{}", config.primary_host, config.primary_port),
            replicas = replicas.len(),
            max_replica_lag = config.max_replica_lag,
            "Workload isolator configured"
        );
        Self::new(
            config.primary_host.clone(),
            config.primary_port,
            replicas,
            config.max_replica_lag,
        )
    }

    pub fn with_lag_checker(mut self, checker: Arc<dyn LagChecker>) -> Self {
        self.lag_checker = Some(checker);
        self
    }

    pub fn max_replica_lag(&self) -> f64 {
        self.max_replica_lag
    }

    fn primary(&self, reason: RouteReason) -> RouteTarget {
        RouteTarget {
            target_type: TargetType::Primary,
            host: self.primary_host.clone(),
            port: self.primary_port,
            reason,
        }
    }

    /// Pick a target for `query`. Never fails: the primary is the fallback
    /// for everything a replica cannot serve.
    #[instrument(skip(self, query), level = "debug")]
    pub fn route_query(&self, query: &Query, priority: QueryPriority) -> RouteTarget {
        match classify(&query.text) {
            QueryKind::Write => return self.primary(RouteReason::WriteOperation),
            QueryKind::Unknown => return self.primary(RouteReason::UnknownOperation),
            QueryKind::Read => {}
        }

        if priority == QueryPriority::Critical {
            return self.primary(RouteReason::CriticalPriority);
        }

        let replicas = self.replicas.load();
        // `min_by` keeps the last of equal elements; fold keeps the first.
        let best = replicas
            .iter()
            .filter(|r| r.is_eligible(self.max_replica_lag))
            .fold(None::<&ReplicaInfo>, |best, r| match best {
                Some(b) if b.replication_lag_seconds <= r.replication_lag_seconds => Some(b),
                _ => Some(r),
            });

        match best {
            Some(replica) => {
                debug!(
                    replica = %replica.id(),
                    lag = replica.replication_lag_seconds,
                    "Routed read to replica"
                );
                RouteTarget {
                    target_type: TargetType::Replica,
                    host: replica.host.clone(),
                    port: replica.port,
                    reason: RouteReason::LowestLagReplica,
                }
            }
            None => {
                debug!("No eligible replica, routing read to primary");
                self.primary(RouteReason::NoHealthyReplica)
            }
        }
    }

    pub fn should_route_to_primary(&self, query: &Query, replica_lag: f64) -> bool {
        classify(&query.text) != QueryKind::Read
            || !replica_lag.is_finite()
            || replica_lag > self.max_replica_lag
    }

    /// Current lag for `replica_id`. Failed or impossible measurements come
    /// back as `f64::INFINITY`, which no lag bound admits.
    pub async fn check_replica_lag(&self, replica_id: &str) -> f64 {
        match &self.lag_checker {
            Some(checker) => match checker.replica_lag(replica_id).await {
                Ok(lag) if lag.is_finite() && lag >= 0.0 => lag,
                Ok(lag) => {
                    warn!(replica = replica_id, lag, "Lag checker returned an invalid lag");
                    f64::INFINITY
                }
                Err(e) => {
                    warn!(replica = replica_id, error = %e, "Replica lag check failed");
                    f64::INFINITY
                }
            },
            None => self
                .replicas
                .load()
                .iter()
                .find(|r| r.id() == replica_id)
                .map_or(f64::INFINITY, |r| r.replication_lag_seconds),
        }
    }

    pub fn get_replica_status(&self) -> Vec<ReplicaStatus> {
        self.replicas
            .load()
            .iter()
            .map(|r| ReplicaStatus {
                id: r.id(),
                info: r.clone(),
                eligible: r.is_eligible(self.max_replica_lag),
            })
            .collect()
    }

    fn is_healthy(&self, replica_id: &str) -> bool {
        self.replicas
            .load()
            .iter()
            .any(|r| r.id() == replica_id && r.is_healthy)
    }

    /// Apply `mutation` to the replica with `replica_id`. Returns false when
    /// no such replica exists.
    pub fn update_replica<M>(&self, replica_id: &str, mutation: M) -> bool
    where
        M: Fn(&mut ReplicaInfo),
    {
        if !self.replicas.load().iter().any(|r| r.id() == replica_id) {
            return false;
        }
        self.replicas.rcu(|current| {
            let mut next = Vec::clone(current);
            if let Some(replica) = next.iter_mut().find(|r| r.id() == replica_id) {
                mutation(replica);
            }
            next
        });
        true
    }

    /// Measure every replica and store the results. Replicas whose lag
    /// cannot be measured are marked unhealthy until a later refresh
    /// measures them again. Unhealthy flags set elsewhere are left alone.
    pub async fn refresh_replica_lags(&self) -> LagRefreshSummary {
        if self.lag_checker.is_none() {
            return LagRefreshSummary::default();
        }

        let ids: SmallVec<[String; 8]> = self.replicas.load().iter().map(ReplicaInfo::id).collect();
        let lags = join_all(ids.iter().map(|id| self.check_replica_lag(id))).await;

        let mut summary = LagRefreshSummary::default();
        for (id, lag) in ids.iter().zip(lags) {
            summary.checked += 1;
            if !lag.is_finite() {
                summary.unreachable += 1;
            }
            let measured = lag.is_finite();
            let restore = if measured {
                self.lag_failures.remove(id.as_str()).is_some()
            } else {
                if self.is_healthy(id) {
                    self.lag_failures.insert(id.clone());
                }
                false
            };
            self.update_replica(id, |r| {
                r.replication_lag_seconds = lag;
                if !measured {
                    r.is_healthy = false;
                } else if restore {
                    r.is_healthy = true;
                }
            });
        }

        debug!(
            checked = summary.checked,
            unreachable = summary.unreachable,
            "Refreshed replica lags"
        );
        summary
    }
}

#[async_trait]
impl ReplicaMonitor for WorkloadIsolator {
    async fn refresh_replica_lags(&self) -> LagRefreshSummary {
        WorkloadIsolator::refresh_replica_lags(self).await
    }
}
