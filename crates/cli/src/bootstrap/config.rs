use quire_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;
    Ok(config)
}

/// Called once the subscriber is installed.
pub fn log_config(config_path: Option<&str>, config: &Config) {
    info!(
        config_file = config_path.unwrap_or("default"),
        min_connections = config.pool.min_connections,
        max_connections = config.pool.max_connections,
        replicas = config.replicas.servers.len(),
        max_replica_lag = config.replicas.max_replica_lag,
        cache_max_size = config.cache.max_size,
        "Configuration loaded"
    );
}
