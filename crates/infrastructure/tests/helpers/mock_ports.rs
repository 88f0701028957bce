#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use quire_application::ports::{
    CacheBackend, ConnectionFactory, LagChecker, RateLimitStore, SharedCacheHit, WindowOutcome,
};
use quire_domain::config::{PoolConfig, RateLimitConfig};
use quire_domain::DomainError;
use quire_infrastructure::pool::ConnectionPoolManager;
use quire_infrastructure::rate_limit::MobileRateLimiter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

// ============================================================================
// Mock ConnectionFactory
// ============================================================================

/// Handle produced by [`MockConnectionFactory`]: the backend it points at and
/// a serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConnection {
    pub backend: &'static str,
    pub serial: u64,
}

#[derive(Clone)]
pub struct MockConnectionFactory {
    backend: &'static str,
    connect_count: Arc<AtomicU64>,
    close_count: Arc<AtomicU64>,
    should_fail: Arc<AtomicBool>,
}

impl MockConnectionFactory {
    pub fn new(backend: &'static str) -> Self {
        Self {
            backend,
            connect_count: Arc::new(AtomicU64::new(0)),
            close_count: Arc::new(AtomicU64::new(0)),
            should_fail: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn connect_count(&self) -> u64 {
        self.connect_count.load(Ordering::Relaxed)
    }

    pub fn close_count(&self) -> u64 {
        self.close_count.load(Ordering::Relaxed)
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    type Connection = MockConnection;

    async fn connect(&self) -> Result<MockConnection, DomainError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::ConnectionFactory(format!(
                "{} refused connection",
                self.backend
            )));
        }
        let serial = self.connect_count.fetch_add(1, Ordering::Relaxed);
        Ok(MockConnection {
            backend: self.backend,
            serial,
        })
    }

    async fn close(&self, _connection: MockConnection) {
        self.close_count.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn pool_config(min: usize, max: usize) -> PoolConfig {
    PoolConfig {
        min_connections: min,
        max_connections: max,
        idle_timeout_seconds: 300,
        acquire_timeout_ms: 100,
    }
}

/// Pool manager over mock factories. The returned factories share counters
/// with the ones inside the manager.
pub fn mock_pools(
    min: usize,
    max: usize,
) -> (
    ConnectionPoolManager<MockConnectionFactory>,
    MockConnectionFactory,
    MockConnectionFactory,
) {
    let read = MockConnectionFactory::new("replica");
    let write = MockConnectionFactory::new("primary");
    let manager = ConnectionPoolManager::new(&pool_config(min, max), read.clone(), write.clone());
    (manager, read, write)
}

// ============================================================================
// Mock LagChecker
// ============================================================================

pub struct MockLagChecker {
    lags: Arc<RwLock<HashMap<String, f64>>>,
    failing: Arc<RwLock<Vec<String>>>,
    call_count: Arc<AtomicU64>,
}

impl MockLagChecker {
    pub fn new() -> Self {
        Self {
            lags: Arc::new(RwLock::new(HashMap::new())),
            failing: Arc::new(RwLock::new(Vec::new())),
            call_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn set_lag(&self, replica_id: &str, lag: f64) {
        self.lags.write().await.insert(replica_id.to_string(), lag);
    }

    pub async fn fail_for(&self, replica_id: &str) {
        self.failing.write().await.push(replica_id.to_string());
    }

    pub async fn recover(&self, replica_id: &str) {
        self.failing.write().await.retain(|id| id != replica_id);
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LagChecker for MockLagChecker {
    async fn replica_lag(&self, replica_id: &str) -> Result<f64, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.failing.read().await.iter().any(|id| id == replica_id) {
            return Err(DomainError::LagCheckFailed(format!("{replica_id} unreachable")));
        }
        self.lags
            .read()
            .await
            .get(replica_id)
            .copied()
            .ok_or_else(|| DomainError::LagCheckFailed(format!("{replica_id} unknown")))
    }
}

// ============================================================================
// Mock CacheBackend (always failing)
// ============================================================================

/// Shared tier that fails every call, counting attempts.
pub struct UnreachableCacheBackend {
    call_count: Arc<AtomicU64>,
}

impl UnreachableCacheBackend {
    pub fn new() -> Self {
        Self {
            call_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    fn fail<T>(&self) -> Result<T, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Err(DomainError::CacheTierUnavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl CacheBackend for UnreachableCacheBackend {
    async fn ping(&self) -> Result<(), DomainError> {
        self.fail()
    }

    async fn get(&self, _key: &str) -> Result<Option<SharedCacheHit>, DomainError> {
        self.fail()
    }

    async fn set_with_ttl(
        &self,
        _key: &str,
        _value: Bytes,
        _ttl: Duration,
    ) -> Result<(), DomainError> {
        self.fail()
    }

    async fn delete(&self, _keys: &[String]) -> Result<u64, DomainError> {
        self.fail()
    }

    async fn add_to_set(
        &self,
        _set_key: &str,
        _member: &str,
        _ttl: Duration,
    ) -> Result<(), DomainError> {
        self.fail()
    }

    async fn set_members(&self, _set_key: &str) -> Result<Vec<String>, DomainError> {
        self.fail()
    }
}

// ============================================================================
// Mock RateLimitStore (always failing)
// ============================================================================

pub struct FailingRateLimitStore {
    call_count: Arc<AtomicU64>,
}

impl FailingRateLimitStore {
    pub fn new() -> Self {
        Self {
            call_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RateLimitStore for FailingRateLimitStore {
    async fn record_in_window(
        &self,
        _key: &str,
        _now_ms: u64,
        _window_ms: u64,
        _limit: u32,
    ) -> Result<WindowOutcome, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Err(DomainError::RateLimitStore("store offline".to_string()))
    }
}

pub fn limiter_with(store: Arc<dyn RateLimitStore>) -> MobileRateLimiter {
    MobileRateLimiter::new(store, RateLimitConfig::default())
}
