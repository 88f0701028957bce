#[path = "../common/mod.rs"]
mod common;

use bytes::Bytes;
use common::{
    backend_name, limiter, pool_config, read_request, FakeConnection, FakeFactory, ScriptedLag,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use quire_application::ports::CacheBackend;
use quire_domain::config::CacheConfig;
use quire_domain::{
    ClientType, DomainError, Query, QueryPriority, ReplicaInfo, RouteReason, TargetType,
};
use quire_infrastructure::cache::{CacheManager, InMemorySharedCache};
use quire_infrastructure::pool::ConnectionPoolManager;
use quire_infrastructure::routing::WorkloadIsolator;
use quire_infrastructure::{RequestContext, ResourceLayer};
use std::sync::Arc;
use std::time::Duration;

const FEED_SQL: &str = "SELECT * FROM feed WHERE user_id = 7";

/// One application instance. Instances built over the same shared tier see
/// each other's cache fills and invalidations.
async fn instance(shared: &Arc<InMemorySharedCache>) -> ResourceLayer<FakeFactory> {
    let backend: Arc<dyn CacheBackend> = shared.clone();
    let cache = CacheManager::connect(&CacheConfig::default(), Some(backend)).await;
    let isolator = WorkloadIsolator::new(
        "primary",
        5432,
        vec![ReplicaInfo::new("replica-a", 5432)],
        5.0,
    );
    layer_with(cache, isolator)
}

fn layer_with(cache: CacheManager, isolator: WorkloadIsolator) -> ResourceLayer<FakeFactory> {
    let pools = ConnectionPoolManager::new(
        &pool_config(0, 2),
        FakeFactory::new("replica"),
        FakeFactory::new("primary"),
    );
    ResourceLayer::new(
        Arc::new(cache),
        Arc::new(pools),
        Arc::new(isolator),
        Arc::new(limiter(1_000)),
        Duration::from_millis(200),
    )
}

fn ctx() -> RequestContext {
    RequestContext::new("user-7", ClientType::MobileIos)
}

fn never_runs(_: &mut FakeConnection) -> BoxFuture<'_, Result<Bytes, DomainError>> {
    async move { Err(DomainError::ConnectionFactory("backend should not be reached".to_string())) }
        .boxed()
}

// ============================================================================
// Shared tier online
// ============================================================================

#[tokio::test]
async fn test_second_instance_reads_through_shared_tier() {
    let shared = Arc::new(InMemorySharedCache::new());
    let a = instance(&shared).await;
    let b = instance(&shared).await;
    assert!(a.cache().tier2_available());

    let filled = a
        .execute_read(&ctx(), read_request("feed:7", FEED_SQL, &["user:7"]), backend_name)
        .await
        .unwrap();
    assert!(!filled.cache_hit);

    let served = b
        .execute_read(&ctx(), read_request("feed:7", FEED_SQL, &["user:7"]), never_runs)
        .await
        .unwrap();
    assert!(served.cache_hit);
    assert_eq!(served.value, Bytes::from("replica"));

    let stats = b.cache().get_stats();
    assert_eq!(stats.tier2_hits, 1);
    // Promoted into b's own tier 1.
    assert_eq!(stats.tier1.size, 1);
    assert_eq!(b.pools().read_pool().factory().opened(), 0);
}

#[tokio::test]
async fn test_write_on_one_instance_invalidates_shared_entries() {
    let shared = Arc::new(InMemorySharedCache::new());
    let a = instance(&shared).await;
    let b = instance(&shared).await;

    a.execute_read(&ctx(), read_request("feed:7", FEED_SQL, &["user:7"]), backend_name)
        .await
        .unwrap();

    let write = b
        .execute_write(&ctx(), &["user:7"], |conn| {
            async move { Ok(Bytes::from(format!("written on {}", conn.backend))) }.boxed()
        })
        .await
        .unwrap();
    assert_eq!(write.value, Bytes::from("written on primary"));

    assert!(shared.get("feed:7").await.unwrap().is_none());
    assert!(shared.set_members("tag:user:7").await.unwrap().is_empty());

    let reread = b
        .execute_read(&ctx(), read_request("feed:7", FEED_SQL, &["user:7"]), backend_name)
        .await
        .unwrap();
    assert!(!reread.cache_hit);
}

// ============================================================================
// Shared tier offline
// ============================================================================

#[tokio::test]
async fn test_unreachable_shared_tier_at_startup_runs_tier1_only() {
    let shared = Arc::new(InMemorySharedCache::new());
    shared.set_offline(true);
    let layer = instance(&shared).await;
    assert!(!layer.cache().tier2_available());

    layer
        .execute_read(&ctx(), read_request("feed:7", FEED_SQL, &["user:7"]), backend_name)
        .await
        .unwrap();
    let hit = layer
        .execute_read(&ctx(), read_request("feed:7", FEED_SQL, &["user:7"]), never_runs)
        .await
        .unwrap();
    assert!(hit.cache_hit);

    let write = layer
        .execute_write(&ctx(), &["user:7"], backend_name)
        .await
        .unwrap();
    assert_eq!(write.invalidated, 1);
    assert_eq!(layer.cache().get_stats().tier2_errors, 0);
}

#[tokio::test]
async fn test_shared_tier_outage_after_startup_is_absorbed() {
    let shared = Arc::new(InMemorySharedCache::new());
    let layer = instance(&shared).await;
    shared.set_offline(true);

    let first = layer
        .execute_read(&ctx(), read_request("feed:7", FEED_SQL, &["user:7"]), backend_name)
        .await
        .unwrap();
    assert!(!first.cache_hit);

    let second = layer
        .execute_read(&ctx(), read_request("feed:7", FEED_SQL, &["user:7"]), never_runs)
        .await
        .unwrap();
    assert!(second.cache_hit);

    let stats = layer.cache().get_stats();
    assert!(stats.tier2_errors >= 2);
    assert!(stats.tier2_available);
}

// ============================================================================
// Replica degradation
// ============================================================================

#[tokio::test]
async fn test_reads_fall_back_to_primary_when_replicas_are_unreachable() {
    let lag = Arc::new(ScriptedLag::default());
    lag.set("replica-a:5432", 0.4);
    lag.set("replica-b:5432", 0.1);
    let isolator = WorkloadIsolator::new(
        "primary",
        5432,
        vec![ReplicaInfo::new("replica-a", 5432), ReplicaInfo::new("replica-b", 5432)],
        5.0,
    )
    .with_lag_checker(lag.clone());
    let layer = layer_with(CacheManager::tier1_only(&CacheConfig::default()), isolator);

    let summary = layer.isolator().refresh_replica_lags().await;
    assert_eq!(summary.checked, 2);
    let routed = layer
        .execute_read(&ctx(), read_request("feed:1", FEED_SQL, &[]), backend_name)
        .await
        .unwrap();
    let target = routed.target.unwrap();
    assert_eq!(target.target_type, TargetType::Replica);
    assert_eq!(target.host, "replica-b");

    lag.unplug("replica-a:5432");
    lag.unplug("replica-b:5432");
    let summary = layer.isolator().refresh_replica_lags().await;
    assert_eq!(summary.unreachable, 2);

    let fallback = layer
        .execute_read(&ctx(), read_request("feed:2", FEED_SQL, &[]), backend_name)
        .await
        .unwrap();
    let target = fallback.target.unwrap();
    assert_eq!(target.target_type, TargetType::Primary);
    assert_eq!(target.reason, RouteReason::NoHealthyReplica);
    assert_eq!(fallback.value, Bytes::from("primary"));

    let critical = layer
        .isolator()
        .route_query(&Query::from(FEED_SQL), QueryPriority::Critical);
    assert_eq!(critical.target_type, TargetType::Primary);
}
