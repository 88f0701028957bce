use crate::cache::CacheManager;
use crate::pool::ConnectionPoolManager;
use crate::rate_limit::MobileRateLimiter;
use crate::routing::WorkloadIsolator;
use bytes::Bytes;
use futures::future::BoxFuture;
use quire_application::ports::ConnectionFactory;
use quire_domain::{
    CacheManagerStats, ClientType, DomainError, PoolManagerStats, Query, QueryPriority,
    RateLimitResult, ReplicaStatus, RouteTarget,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Who is asking. Drives quota selection and the admin bypass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: String,
    pub client_type: ClientType,
    pub is_admin: bool,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>, client_type: ClientType) -> Self {
        Self {
            user_id: user_id.into(),
            client_type,
            is_admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// A cacheable read: what to run and how to store the answer.
#[derive(Debug, Clone)]
pub struct ReadRequest<'a> {
    pub cache_key: &'a str,
    pub query: Query,
    pub priority: QueryPriority,
    pub ttl: Option<Duration>,
    pub tags: &'a [&'a str],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOutcome {
    pub value: Bytes,
    pub cache_hit: bool,
    /// `None` on cache hits; no backend was chosen.
    pub target: Option<RouteTarget>,
    /// `None` for admins.
    pub rate_limit: Option<RateLimitResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub value: Bytes,
    pub invalidated: usize,
    pub rate_limit: Option<RateLimitResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStats {
    pub pools: PoolManagerStats,
    pub cache: CacheManagerStats,
    pub replicas: Vec<ReplicaStatus>,
}

/// The four shared components wired together.
///
/// Reads go quota, cache, route, pool, backend, cache fill. Writes go quota,
/// write pool, backend, tag invalidation.
pub struct ResourceLayer<F: ConnectionFactory> {
    cache: Arc<CacheManager>,
    pools: Arc<ConnectionPoolManager<F>>,
    isolator: Arc<WorkloadIsolator>,
    limiter: Arc<MobileRateLimiter>,
    acquire_timeout: Duration,
}

impl<F: ConnectionFactory> ResourceLayer<F> {
    pub fn new(
        cache: Arc<CacheManager>,
        pools: Arc<ConnectionPoolManager<F>>,
        isolator: Arc<WorkloadIsolator>,
        limiter: Arc<MobileRateLimiter>,
        acquire_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            pools,
            isolator,
            limiter,
            acquire_timeout,
        }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn pools(&self) -> &Arc<ConnectionPoolManager<F>> {
        &self.pools
    }

    pub fn isolator(&self) -> &Arc<WorkloadIsolator> {
        &self.isolator
    }

    pub fn limiter(&self) -> &Arc<MobileRateLimiter> {
        &self.limiter
    }

    pub async fn prewarm(&self) -> Result<(), DomainError> {
        self.pools.prewarm().await
    }

    /// Serve a read from cache, or run it on the routed backend and cache
    /// the answer. `run` gets the checked-out connection; it is released
    /// whether or not `run` succeeds.
    #[instrument(skip(self, request, run), fields(key = request.cache_key, user = %ctx.user_id))]
    pub async fn execute_read<R>(
        &self,
        ctx: &RequestContext,
        request: ReadRequest<'_>,
        run: R,
    ) -> Result<ReadOutcome, DomainError>
    where
        R: for<'c> FnOnce(&'c mut F::Connection) -> BoxFuture<'c, Result<Bytes, DomainError>>
            + Send,
    {
        let rate_limit = self
            .limiter
            .enforce(&ctx.user_id, ctx.is_admin, &ctx.client_type)
            .await?;

        if let Some(value) = self.cache.get(request.cache_key).await {
            debug!("Read served from cache");
            return Ok(ReadOutcome {
                value,
                cache_hit: true,
                target: None,
                rate_limit,
            });
        }

        let target = self.isolator.route_query(&request.query, request.priority);
        let mut conn = self
            .pools
            .get_connection_for(&target, self.acquire_timeout)
            .await?;

        let result = run(conn.handle_mut()).await;
        if let Err(e) = self.pools.release_connection(conn).await {
            warn!(error = %e, "Failed to release connection after read");
        }
        let value = result?;

        self.cache
            .set(request.cache_key, value.clone(), request.ttl, request.tags)
            .await;
        debug!(target = %target.address(), reason = %target.reason, "Read served from backend");

        Ok(ReadOutcome {
            value,
            cache_hit: false,
            target: Some(target),
            rate_limit,
        })
    }

    /// Run a write on the primary and drop every cache entry tagged with
    /// `invalidate_tags` once it succeeds.
    #[instrument(skip(self, run), fields(user = %ctx.user_id))]
    pub async fn execute_write<R>(
        &self,
        ctx: &RequestContext,
        invalidate_tags: &[&str],
        run: R,
    ) -> Result<WriteOutcome, DomainError>
    where
        R: for<'c> FnOnce(&'c mut F::Connection) -> BoxFuture<'c, Result<Bytes, DomainError>>
            + Send,
    {
        let rate_limit = self
            .limiter
            .enforce(&ctx.user_id, ctx.is_admin, &ctx.client_type)
            .await?;

        let mut conn = self.pools.get_write_connection(self.acquire_timeout).await?;
        let result = run(conn.handle_mut()).await;
        if let Err(e) = self.pools.release_connection(conn).await {
            warn!(error = %e, "Failed to release connection after write");
        }
        let value = result?;

        let invalidated = if invalidate_tags.is_empty() {
            0
        } else {
            self.cache.invalidate_by_tags(invalidate_tags).await
        };

        Ok(WriteOutcome {
            value,
            invalidated,
            rate_limit,
        })
    }

    pub fn stats(&self) -> LayerStats {
        LayerStats {
            pools: self.pools.get_pool_stats(),
            cache: self.cache.get_stats(),
            replicas: self.isolator.get_replica_status(),
        }
    }

    pub async fn shutdown(&self) {
        self.pools.close_all().await;
    }
}
