use async_trait::async_trait;
use bytes::Bytes;
use quire_domain::DomainError;
use std::time::Duration;

/// A value read from the shared tier with the expiry the tier reports for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedCacheHit {
    pub value: Bytes,
    /// `None` when the shared tier holds the key without expiry.
    pub remaining_ttl: Option<Duration>,
}

/// Networked cache tier shared across processes.
///
/// Set operations (`add_to_set`, `set_members`) back the tag index: one set
/// per tag holding the keys written with that tag. A set expires `ttl` after
/// the add with the latest deadline, so it never outlives its members.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn ping(&self) -> Result<(), DomainError>;

    async fn get(&self, key: &str) -> Result<Option<SharedCacheHit>, DomainError>;

    async fn set_with_ttl(&self, key: &str, value: Bytes, ttl: Duration)
        -> Result<(), DomainError>;

    /// Delete keys (values or sets). Returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, DomainError>;

    async fn add_to_set(&self, set_key: &str, member: &str, ttl: Duration)
        -> Result<(), DomainError>;

    async fn set_members(&self, set_key: &str) -> Result<Vec<String>, DomainError>;
}
