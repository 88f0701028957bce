//! Quire Domain Layer
pub mod cache_stats;
pub mod config;
pub mod errors;
pub mod pool;
pub mod rate_limit;
pub mod replica;

pub use cache_stats::{CacheManagerStats, CacheStats};
pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DomainError;
pub use pool::{PoolManagerStats, PoolStats, PoolType};
pub use rate_limit::{ClientType, RateLimitResult};
pub use replica::{
    Query, QueryKind, QueryPriority, ReplicaInfo, ReplicaStatus, RouteReason, RouteTarget,
    TargetType,
};
