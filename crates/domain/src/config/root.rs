use super::{
    CacheConfig, ConfigError, DatabaseConfig, JobsConfig, LoggingConfig, PoolConfig,
    RateLimitConfig, ReplicaConfig,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub replicas: ReplicaConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command line overrides applied on top of the file configuration
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub min_connections: Option<usize>,
    pub max_connections: Option<usize>,
    pub database_url: Option<String>,
}

impl Config {
    /// Load configuration from `path` (defaults when `None`) and apply CLI overrides.
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(Path::new(p))?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(min) = overrides.min_connections {
            self.pool.min_connections = min;
        }
        if let Some(max) = overrides.max_connections {
            self.pool.max_connections = max;
        }
        if let Some(url) = overrides.database_url {
            self.database.write_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.max_connections == 0 {
            return Err(ConfigError::Validation(
                "pool.max_connections must be at least 1".into(),
            ));
        }
        if self.pool.min_connections > self.pool.max_connections {
            return Err(ConfigError::Validation(format!(
                "pool.min_connections ({}) exceeds pool.max_connections ({})",
                self.pool.min_connections, self.pool.max_connections
            )));
        }
        if self.pool.acquire_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "pool.acquire_timeout_ms must be greater than 0".into(),
            ));
        }
        if !self.replicas.max_replica_lag.is_finite() || self.replicas.max_replica_lag < 0.0 {
            return Err(ConfigError::Validation(
                "replicas.max_replica_lag must be a non-negative number".into(),
            ));
        }
        if self.cache.max_size == 0 {
            return Err(ConfigError::Validation(
                "cache.max_size must be at least 1".into(),
            ));
        }
        if self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.window_seconds must be greater than 0".into(),
            ));
        }
        if self.rate_limit.default_limit == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.default_limit must be greater than 0".into(),
            ));
        }
        if let Some((client, _)) = self.rate_limit.limits.iter().find(|(_, limit)| **limit == 0) {
            return Err(ConfigError::Validation(format!(
                "rate_limit.limits.{client} must be greater than 0"
            )));
        }
        if self.jobs.idle_sweep_interval == 0
            || self.jobs.lag_check_interval == 0
            || self.jobs.cache_compaction_interval == 0
            || self.jobs.rate_limit_sweep_interval == 0
        {
            return Err(ConfigError::Validation(
                "job intervals must be greater than 0".into(),
            ));
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not one of {:?}",
                self.logging.level, valid_levels
            )));
        }
        Ok(())
    }
}
