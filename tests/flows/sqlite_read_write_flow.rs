#[path = "../common/mod.rs"]
mod common;

use bytes::Bytes;
use common::{limiter, pool_config, read_request};
use futures::future::BoxFuture;
use futures::FutureExt;
use quire_domain::config::CacheConfig;
use quire_domain::{ClientType, DomainError, ReplicaInfo, TargetType};
use quire_infrastructure::cache::CacheManager;
use quire_infrastructure::pool::{ConnectionPoolManager, SqliteConnectionFactory};
use quire_infrastructure::routing::WorkloadIsolator;
use quire_infrastructure::{RequestContext, ResourceLayer};
use sqlx::SqliteConnection;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const STORY_SQL: &str = "SELECT title FROM stories WHERE id = 1";

fn sqlite_layer(dir: &TempDir, web_limit: u32) -> ResourceLayer<SqliteConnectionFactory> {
    let url = format!("sqlite://{}", dir.path().join("flow.db").display());
    let pools = ConnectionPoolManager::new(
        &pool_config(0, 2),
        SqliteConnectionFactory::reader(&url).unwrap(),
        SqliteConnectionFactory::writer(&url).unwrap(),
    );
    // The read-only handle on the same file stands in for a replica.
    let isolator = WorkloadIsolator::new(
        "primary",
        5432,
        vec![ReplicaInfo::new("local-replica", 5432).with_lag(0.0)],
        5.0,
    );
    ResourceLayer::new(
        Arc::new(CacheManager::tier1_only(&CacheConfig::default())),
        Arc::new(pools),
        Arc::new(isolator),
        Arc::new(limiter(web_limit)),
        Duration::from_secs(1),
    )
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::ConnectionFactory(e.to_string())
}

async fn seed(layer: &ResourceLayer<SqliteConnectionFactory>, ctx: &RequestContext) {
    layer
        .execute_write(ctx, &[], |conn: &mut SqliteConnection| {
            async move {
                sqlx::query("CREATE TABLE stories (id INTEGER PRIMARY KEY, title TEXT NOT NULL)")
                    .execute(&mut *conn)
                    .await
                    .map_err(db_error)?;
                sqlx::query("INSERT INTO stories (id, title) VALUES (1, 'launch day')")
                    .execute(&mut *conn)
                    .await
                    .map_err(db_error)?;
                Ok(Bytes::new())
            }
            .boxed()
        })
        .await
        .unwrap();
}

fn fetch_title(conn: &mut SqliteConnection) -> BoxFuture<'_, Result<Bytes, DomainError>> {
    async move {
        let title: String = sqlx::query_scalar(STORY_SQL)
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error)?;
        Ok(Bytes::from(title))
    }
    .boxed()
}

// ============================================================================
// Read/write cycle
// ============================================================================

#[tokio::test]
async fn test_read_is_cached_until_write_invalidates_its_tag() {
    let dir = TempDir::new().unwrap();
    let layer = sqlite_layer(&dir, 100);
    let ctx = RequestContext::new("reader-1", ClientType::Web);
    seed(&layer, &ctx).await;

    let first = layer
        .execute_read(&ctx, read_request("story:1", STORY_SQL, &["story:1"]), fetch_title)
        .await
        .unwrap();
    assert!(!first.cache_hit);
    assert_eq!(first.value, Bytes::from("launch day"));
    assert_eq!(first.target.unwrap().target_type, TargetType::Replica);

    let second = layer
        .execute_read(&ctx, read_request("story:1", STORY_SQL, &["story:1"]), fetch_title)
        .await
        .unwrap();
    assert!(second.cache_hit);
    assert_eq!(second.value, Bytes::from("launch day"));

    let write = layer
        .execute_write(&ctx, &["story:1"], |conn: &mut SqliteConnection| {
            async move {
                sqlx::query("UPDATE stories SET title = 'launch recap' WHERE id = 1")
                    .execute(&mut *conn)
                    .await
                    .map_err(db_error)?;
                Ok(Bytes::new())
            }
            .boxed()
        })
        .await
        .unwrap();
    assert_eq!(write.invalidated, 1);

    let third = layer
        .execute_read(&ctx, read_request("story:1", STORY_SQL, &["story:1"]), fetch_title)
        .await
        .unwrap();
    assert!(!third.cache_hit);
    assert_eq!(third.value, Bytes::from("launch recap"));

    layer.shutdown().await;
}

#[tokio::test]
async fn test_connections_return_to_their_pools() {
    let dir = TempDir::new().unwrap();
    let layer = sqlite_layer(&dir, 100);
    let ctx = RequestContext::new("reader-1", ClientType::Web);
    seed(&layer, &ctx).await;

    layer
        .execute_read(&ctx, read_request("story:1", STORY_SQL, &[]), fetch_title)
        .await
        .unwrap();

    let stats = layer.stats();
    assert_eq!(stats.pools.read.active_connections, 0);
    assert_eq!(stats.pools.read.idle_connections, 1);
    assert_eq!(stats.pools.write.active_connections, 0);
    assert_eq!(stats.pools.write.idle_connections, 1);

    layer.shutdown().await;
    let stats = layer.stats();
    assert_eq!(stats.pools.read.total_connections, 0);
    assert_eq!(stats.pools.write.total_connections, 0);
}

#[tokio::test]
async fn test_failed_backend_call_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let layer = sqlite_layer(&dir, 100);
    let ctx = RequestContext::new("reader-1", ClientType::Web);

    // Nothing has created the database file yet.
    let result = layer
        .execute_read(&ctx, read_request("story:1", STORY_SQL, &[]), fetch_title)
        .await;
    assert!(result.is_err());
    assert_eq!(layer.cache().get_stats().tier1.size, 0);
    let read = layer.stats().pools.read;
    assert_eq!(read.active_connections, 0);
    assert_eq!(read.connection_errors, 1);
}

// ============================================================================
// Admission
// ============================================================================

#[tokio::test]
async fn test_quota_rejects_before_touching_the_database() {
    let dir = TempDir::new().unwrap();
    let layer = sqlite_layer(&dir, 2);
    let ctx = RequestContext::new("busy-user", ClientType::Web);
    seed(&layer, &ctx).await;

    layer
        .execute_read(&ctx, read_request("story:1", STORY_SQL, &[]), fetch_title)
        .await
        .unwrap();

    let rejected = layer
        .execute_read(&ctx, read_request("story:1", STORY_SQL, &[]), fetch_title)
        .await
        .unwrap_err();
    match rejected {
        DomainError::RateLimitExceeded { limit, retry_after_secs } => {
            assert_eq!(limit, 2);
            assert!(retry_after_secs >= 1);
        }
        other => panic!("expected rate limit rejection, got {other:?}"),
    }

    let admin = RequestContext::new("busy-user", ClientType::Web).admin();
    let outcome = layer
        .execute_read(&admin, read_request("story:1", STORY_SQL, &[]), fetch_title)
        .await
        .unwrap();
    assert!(outcome.rate_limit.is_none());
    assert!(outcome.cache_hit);

    layer.shutdown().await;
}
