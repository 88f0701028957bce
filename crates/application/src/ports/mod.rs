pub mod cache_backend;
pub mod connection_factory;
pub mod lag_checker;
pub mod maintenance;
pub mod rate_limit_store;

pub use cache_backend::{CacheBackend, SharedCacheHit};
pub use connection_factory::ConnectionFactory;
pub use lag_checker::LagChecker;
pub use maintenance::{
    CacheSweeper, ConnectionReclaimer, LagRefreshSummary, RateLimitSweeper, ReplicaMonitor,
};
pub use rate_limit_store::{RateLimitStore, WindowOutcome};
