use quire_domain::Config;
use quire_infrastructure::cache::CacheManager;
use quire_infrastructure::pool::{ConnectionPoolManager, SqliteConnectionFactory};
use quire_infrastructure::rate_limit::{InMemoryRateLimitStore, MobileRateLimiter};
use quire_infrastructure::routing::WorkloadIsolator;
use quire_infrastructure::ResourceLayer;
use std::sync::Arc;
use tracing::{error, info};

pub type SqliteLayer = ResourceLayer<SqliteConnectionFactory>;

/// Wire pools, cache, isolator and limiter from configuration.
///
/// The write pool opens `database.write_url`; the read pool opens
/// `database.read_url` (or the write database) read-only.
pub async fn build_layer(config: &Config) -> anyhow::Result<Arc<SqliteLayer>> {
    let write_url = config.database.write_url.as_str();
    let read_url = config.database.effective_read_url();
    info!(write_url, read_url, "Initializing connection pools");

    let write_factory = SqliteConnectionFactory::writer(write_url).map_err(|e| {
        error!("Failed to configure write pool: {}", e);
        anyhow::anyhow!(e)
    })?;
    let read_factory = SqliteConnectionFactory::reader(read_url).map_err(|e| {
        error!("Failed to configure read pool: {}", e);
        anyhow::anyhow!(e)
    })?;

    let pools = Arc::new(ConnectionPoolManager::new(
        &config.pool,
        read_factory,
        write_factory,
    ));
    let cache = Arc::new(CacheManager::connect(&config.cache, None).await);
    let isolator = Arc::new(WorkloadIsolator::from_config(&config.replicas));
    let limiter = Arc::new(MobileRateLimiter::new(
        Arc::new(InMemoryRateLimitStore::new()),
        config.rate_limit.clone(),
    ));

    info!(
        max_connections = config.pool.max_connections,
        replicas = isolator.get_replica_status().len(),
        tier2 = cache.tier2_available(),
        "Resource layer ready"
    );

    Ok(Arc::new(ResourceLayer::new(
        cache,
        pools,
        isolator,
        limiter,
        config.pool.acquire_timeout(),
    )))
}
