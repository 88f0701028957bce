use crate::pool::PoolType;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("{pool} pool exhausted after waiting {waited_ms}ms")]
    PoolExhausted { pool: PoolType, waited_ms: u64 },

    #[error("{0} pool is closed")]
    PoolClosed(PoolType),

    #[error("Connection factory error: {0}")]
    ConnectionFactory(String),

    #[error("Connection {0} is not checked out from this pool")]
    UnknownConnection(u64),

    #[error("Cache tier unavailable: {0}")]
    CacheTierUnavailable(String),

    #[error("Rate limit of {limit} requests exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { limit: u32, retry_after_secs: u64 },

    #[error("Replica lag check failed: {0}")]
    LagCheckFailed(String),

    #[error("Rate limit store error: {0}")]
    RateLimitStore(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DomainError {
    /// How long the caller should wait before retrying, for the failures that
    /// represent backpressure rather than breakage.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::PoolExhausted { waited_ms, .. } => Some(Duration::from_millis(*waited_ms)),
            Self::RateLimitExceeded {
                retry_after_secs, ..
            } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. }
                | Self::ConnectionFactory(_)
                | Self::RateLimitExceeded { .. }
                | Self::CacheTierUnavailable(_)
        )
    }
}
