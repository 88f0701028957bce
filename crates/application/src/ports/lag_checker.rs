use async_trait::async_trait;
use quire_domain::DomainError;

/// Live replication lag measurement, keyed by replica id (`host:port`).
#[async_trait]
pub trait LagChecker: Send + Sync {
    async fn replica_lag(&self, replica_id: &str) -> Result<f64, DomainError>;
}
