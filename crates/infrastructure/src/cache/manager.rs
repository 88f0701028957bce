use super::lru::{clamp_ttl, LruCache};
use bytes::Bytes;
use quire_application::ports::{CacheBackend, CacheSweeper};
use quire_domain::config::CacheConfig;
use quire_domain::{CacheManagerStats, DomainError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const TAG_SET_PREFIX: &str = "tag:";

fn tag_set_key(tag: &str) -> String {
    let mut key = String::with_capacity(TAG_SET_PREFIX.len() + tag.len());
    key.push_str(TAG_SET_PREFIX);
    key.push_str(tag);
    key
}

/// Two-tier cache: the in-process [`LruCache`] in front of an optional
/// shared [`CacheBackend`].
///
/// Tier 2 is probed once at construction. When the probe fails, or a later
/// call fails, the manager keeps serving from tier 1 and counts the error.
pub struct CacheManager {
    tier1: LruCache,
    tier2: Option<Arc<dyn CacheBackend>>,
    tier2_available: AtomicBool,
    tier2_hits: AtomicU64,
    tier2_misses: AtomicU64,
    tier2_errors: AtomicU64,
    total_misses: AtomicU64,
}

impl CacheManager {
    /// Tier-1 only manager. Never touches the network.
    pub fn tier1_only(config: &CacheConfig) -> Self {
        Self {
            tier1: LruCache::new(config.max_size, config.default_ttl()),
            tier2: None,
            tier2_available: AtomicBool::new(false),
            tier2_hits: AtomicU64::new(0),
            tier2_misses: AtomicU64::new(0),
            tier2_errors: AtomicU64::new(0),
            total_misses: AtomicU64::new(0),
        }
    }

    /// Build the manager and probe tier 2 once.
    pub async fn connect(config: &CacheConfig, tier2: Option<Arc<dyn CacheBackend>>) -> Self {
        let mut manager = Self::tier1_only(config);
        let Some(backend) = tier2 else {
            info!(
                max_size = config.max_size,
                "Cache manager running with in-process tier only"
            );
            return manager;
        };

        let available = match backend.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Shared cache tier unreachable, continuing with in-process tier only");
                false
            }
        };

        info!(
            max_size = config.max_size,
            default_ttl_secs = config.default_ttl_seconds,
            tier2_available = available,
            "Cache manager initialized"
        );

        manager.tier2_available = AtomicBool::new(available);
        manager.tier2 = Some(backend);
        manager
    }

    pub fn tier2_available(&self) -> bool {
        self.tier2_available.load(AtomicOrdering::Relaxed)
    }

    fn tier2(&self) -> Option<&Arc<dyn CacheBackend>> {
        if self.tier2_available() {
            self.tier2.as_ref()
        } else {
            None
        }
    }

    fn record_tier2_error(&self, operation: &'static str, key: &str, error: &DomainError) {
        self.tier2_errors.fetch_add(1, AtomicOrdering::Relaxed);
        warn!(operation, key, error = %error, "Shared cache tier call failed");
    }

    pub fn tier1(&self) -> &LruCache {
        &self.tier1
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        if let Some(value) = self.tier1.get(key) {
            return Some(value);
        }

        if let Some(tier2) = self.tier2() {
            match tier2.get(key).await {
                Ok(Some(hit)) => {
                    self.tier2_hits.fetch_add(1, AtomicOrdering::Relaxed);
                    let ttl = hit.remaining_ttl.unwrap_or(self.tier1.default_ttl());
                    self.tier1.set(key, hit.value.clone(), Some(ttl), &[]);
                    debug!(key, ttl_secs = ttl.as_secs(), "Repopulated in-process tier from shared tier");
                    return Some(hit.value);
                }
                Ok(None) => {
                    self.tier2_misses.fetch_add(1, AtomicOrdering::Relaxed);
                }
                Err(e) => self.record_tier2_error("get", key, &e),
            }
        }

        self.total_misses.fetch_add(1, AtomicOrdering::Relaxed);
        None
    }

    /// Write both tiers. Tier-2 failures are logged and counted, never returned.
    #[instrument(skip(self, value), level = "debug", fields(len = value.len()))]
    pub async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>, tags: &[&str]) {
        self.tier1.set(key, value.clone(), ttl, tags);

        let Some(tier2) = self.tier2() else {
            return;
        };

        let ttl = clamp_ttl(ttl.unwrap_or(self.tier1.default_ttl()));
        if let Err(e) = tier2.set_with_ttl(key, value, ttl).await {
            self.record_tier2_error("set", key, &e);
            return;
        }

        for tag in tags {
            if let Err(e) = tier2.add_to_set(&tag_set_key(tag), key, ttl).await {
                self.record_tier2_error("tag", key, &e);
            }
        }
    }

    pub async fn invalidate(&self, key: &str) {
        self.tier1.delete(key);

        if let Some(tier2) = self.tier2() {
            if let Err(e) = tier2.delete(&[key.to_string()]).await {
                self.record_tier2_error("delete", key, &e);
            }
        }
    }

    /// Remove every entry tagged with any of `tags` from both tiers.
    /// Returns the number of tier-1 entries removed.
    #[instrument(skip(self), level = "debug")]
    pub async fn invalidate_by_tags(&self, tags: &[&str]) -> usize {
        let mut removed = self.tier1.delete_by_tags(tags);

        let Some(tier2) = self.tier2() else {
            return removed;
        };

        for tag in tags {
            let set_key = tag_set_key(tag);
            let members = match tier2.set_members(&set_key).await {
                Ok(members) => members,
                Err(e) => {
                    self.record_tier2_error("set_members", &set_key, &e);
                    continue;
                }
            };

            // Keys tagged by another process may still sit in this tier 1.
            removed += members.iter().filter(|key| self.tier1.delete(key)).count();

            if !members.is_empty() {
                if let Err(e) = tier2.delete(&members).await {
                    self.record_tier2_error("delete", &set_key, &e);
                    continue;
                }
            }
            if let Err(e) = tier2.delete(std::slice::from_ref(&set_key)).await {
                self.record_tier2_error("delete", &set_key, &e);
            }
        }

        debug!(tags = ?tags, removed, "Invalidated cache entries by tag");
        removed
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                self.invalidate(key).await;
                None
            }
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
        tags: &[&str],
    ) -> Result<(), DomainError> {
        let raw = serde_json::to_vec(value).map_err(|e| DomainError::Serialization(e.to_string()))?;
        self.set(key, Bytes::from(raw), ttl, tags).await;
        Ok(())
    }

    /// Sweep expired tier-1 entries.
    pub fn compact(&self) -> usize {
        let removed = self.tier1.cleanup_expired();
        if removed > 0 {
            debug!(removed, "Compacted in-process cache tier");
        }
        removed
    }

    pub fn get_stats(&self) -> CacheManagerStats {
        CacheManagerStats {
            tier1: self.tier1.stats(),
            tier2_available: self.tier2_available(),
            tier2_hits: self.tier2_hits.load(AtomicOrdering::Relaxed),
            tier2_misses: self.tier2_misses.load(AtomicOrdering::Relaxed),
            tier2_errors: self.tier2_errors.load(AtomicOrdering::Relaxed),
            total_misses: self.total_misses.load(AtomicOrdering::Relaxed),
        }
    }
}

impl CacheSweeper for CacheManager {
    fn sweep_expired(&self) -> usize {
        self.compact()
    }
}
