use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use quire_application::ports::{ConnectionFactory, LagChecker};
use quire_domain::config::{PoolConfig, RateLimitConfig};
use quire_domain::{DomainError, Query, QueryPriority};
use quire_infrastructure::rate_limit::{InMemoryRateLimitStore, MobileRateLimiter};
use quire_infrastructure::ReadRequest;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Connections
// ============================================================================

#[derive(Debug)]
pub struct FakeConnection {
    pub backend: &'static str,
}

#[derive(Clone)]
pub struct FakeFactory {
    backend: &'static str,
    opened: Arc<AtomicU64>,
    closed: Arc<AtomicU64>,
}

impl FakeFactory {
    pub fn new(backend: &'static str) -> Self {
        Self {
            backend,
            opened: Arc::new(AtomicU64::new(0)),
            closed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for FakeFactory {
    type Connection = FakeConnection;

    async fn connect(&self) -> Result<FakeConnection, DomainError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakeConnection {
            backend: self.backend,
        })
    }

    async fn close(&self, _connection: FakeConnection) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn backend_name(conn: &mut FakeConnection) -> BoxFuture<'_, Result<Bytes, DomainError>> {
    async move { Ok(Bytes::from(conn.backend)) }.boxed()
}

// ============================================================================
// Replica lag
// ============================================================================

/// Lag per replica id; ids without an entry fail the measurement.
#[derive(Default)]
pub struct ScriptedLag {
    lags: Mutex<HashMap<String, f64>>,
    calls: AtomicU64,
}

impl ScriptedLag {
    pub fn set(&self, replica_id: &str, lag: f64) {
        self.lags
            .lock()
            .unwrap()
            .insert(replica_id.to_string(), lag);
    }

    pub fn unplug(&self, replica_id: &str) {
        self.lags.lock().unwrap().remove(replica_id);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LagChecker for ScriptedLag {
    async fn replica_lag(&self, replica_id: &str) -> Result<f64, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lags
            .lock()
            .unwrap()
            .get(replica_id)
            .copied()
            .ok_or_else(|| DomainError::LagCheckFailed(format!("{replica_id} unreachable")))
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn pool_config(min: usize, max: usize) -> PoolConfig {
    PoolConfig {
        min_connections: min,
        max_connections: max,
        idle_timeout_seconds: 30,
        acquire_timeout_ms: 200,
    }
}

pub fn limiter(web_limit: u32) -> MobileRateLimiter {
    MobileRateLimiter::new(
        Arc::new(InMemoryRateLimitStore::new()),
        RateLimitConfig {
            window_seconds: 60,
            default_limit: 60,
            limits: BTreeMap::from([("web".to_string(), web_limit)]),
        },
    )
}

pub fn read_request<'a>(key: &'a str, sql: &str, tags: &'a [&'a str]) -> ReadRequest<'a> {
    ReadRequest {
        cache_key: key,
        query: Query::from(sql),
        priority: QueryPriority::Normal,
        ttl: Some(Duration::from_secs(300)),
        tags,
    }
}
