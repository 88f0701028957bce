//! Configuration module for Quire
//!
//! This module contains all configuration structures organized by concern:
//! - `root`: Main configuration and CLI overrides
//! - `pool`: Connection pool sizing and timeouts
//! - `database`: Backend connection targets
//! - `replicas`: Primary/replica topology and lag bound
//! - `cache`: In-process cache sizing
//! - `rate_limit`: Per-client-type quotas
//! - `jobs`: Background maintenance intervals
//! - `logging`: Logging settings
//! - `errors`: Configuration errors

pub mod cache;
pub mod database;
pub mod errors;
pub mod jobs;
pub mod logging;
pub mod pool;
pub mod rate_limit;
pub mod replicas;
pub mod root;

pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use errors::ConfigError;
pub use jobs::JobsConfig;
pub use logging::LoggingConfig;
pub use pool::PoolConfig;
pub use rate_limit::RateLimitConfig;
pub use replicas::{ReplicaConfig, ReplicaEndpoint};
pub use root::{CliOverrides, Config};
