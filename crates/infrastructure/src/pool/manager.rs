use super::connection::PooledConnection;
use super::connection_pool::ConnectionPool;
use async_trait::async_trait;
use quire_application::ports::{ConnectionFactory, ConnectionReclaimer};
use quire_domain::config::PoolConfig;
use quire_domain::{DomainError, PoolManagerStats, PoolType, RouteTarget};
use std::time::Duration;
use tracing::{info, warn};

/// Read and write pools with the same sizing and separate factories.
///
/// The pools share nothing, so exhausting one never blocks the other.
pub struct ConnectionPoolManager<F: ConnectionFactory> {
    read: ConnectionPool<F>,
    write: ConnectionPool<F>,
}

impl<F: ConnectionFactory> ConnectionPoolManager<F> {
    pub fn new(config: &PoolConfig, read_factory: F, write_factory: F) -> Self {
        info!(
            min = config.min_connections,
            max = config.max_connections,
            "Initializing read/write connection pools"
        );
        Self {
            read: ConnectionPool::new(PoolType::Read, config, read_factory),
            write: ConnectionPool::new(PoolType::Write, config, write_factory),
        }
    }

    pub fn read_pool(&self) -> &ConnectionPool<F> {
        &self.read
    }

    pub fn write_pool(&self) -> &ConnectionPool<F> {
        &self.write
    }

    /// Prewarm both pools concurrently. The first failure is returned after
    /// both attempts finish.
    pub async fn prewarm(&self) -> Result<(), DomainError> {
        let (read, write) = tokio::join!(self.read.prewarm(), self.write.prewarm());
        read?;
        write?;
        Ok(())
    }

    pub async fn get_read_connection(
        &self,
        timeout: Duration,
    ) -> Result<PooledConnection<F::Connection>, DomainError> {
        self.read.get_connection(timeout).await
    }

    pub async fn get_write_connection(
        &self,
        timeout: Duration,
    ) -> Result<PooledConnection<F::Connection>, DomainError> {
        self.write.get_connection(timeout).await
    }

    /// Replica targets draw from the read pool, the primary from the write pool.
    pub async fn get_connection_for(
        &self,
        target: &RouteTarget,
        timeout: Duration,
    ) -> Result<PooledConnection<F::Connection>, DomainError> {
        if target.is_primary() {
            self.get_write_connection(timeout).await
        } else {
            self.get_read_connection(timeout).await
        }
    }

    pub async fn release_connection(
        &self,
        conn: PooledConnection<F::Connection>,
    ) -> Result<(), DomainError> {
        match conn.pool_type() {
            PoolType::Read => self.read.release_connection(conn).await,
            PoolType::Write => self.write.release_connection(conn).await,
            PoolType::Generic => {
                warn!(id = conn.id(), "Generic connection released to read/write manager");
                // Neither pool holds it; the write pool closes and rejects it.
                self.write.release_connection(conn).await
            }
        }
    }

    pub async fn close_idle_connections(&self, idle_timeout: Duration) -> usize {
        let (read, write) = tokio::join!(
            self.read.close_idle_connections(idle_timeout),
            self.write.close_idle_connections(idle_timeout)
        );
        read + write
    }

    pub fn get_pool_stats(&self) -> PoolManagerStats {
        PoolManagerStats {
            read: self.read.stats(),
            write: self.write.stats(),
        }
    }

    pub async fn close_all(&self) {
        tokio::join!(self.read.close_all(), self.write.close_all());
    }
}

#[async_trait]
impl<F: ConnectionFactory> ConnectionReclaimer for ConnectionPoolManager<F> {
    async fn reclaim_idle(&self, idle_timeout: Duration) -> usize {
        self.close_idle_connections(idle_timeout).await
    }
}
