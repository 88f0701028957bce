use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use quire_application::ports::{CacheBackend, SharedCacheHit};
use quire_domain::DomainError;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio::time::Instant;

struct SharedValue {
    value: Bytes,
    expires_at: Option<Instant>,
}

struct SharedSet {
    members: FxHashSet<String>,
    expires_at: Option<Instant>,
}

/// `None` when `ttl` reaches past what the clock can represent.
fn deadline(now: Instant, ttl: Duration) -> Option<Instant> {
    now.checked_add(ttl)
}

/// Process-local stand-in for the networked tier: TTL values plus string sets.
///
/// `set_offline(true)` makes every call fail with `CacheTierUnavailable`, which
/// is how degraded-mode behaviour is exercised without a real server.
pub struct InMemorySharedCache {
    values: DashMap<String, SharedValue, FxBuildHasher>,
    sets: DashMap<String, SharedSet, FxBuildHasher>,
    offline: AtomicBool,
}

impl InMemorySharedCache {
    pub fn new() -> Self {
        Self {
            values: DashMap::with_hasher(FxBuildHasher),
            sets: DashMap::with_hasher(FxBuildHasher),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::Relaxed);
    }

    fn check_online(&self) -> Result<(), DomainError> {
        if self.offline.load(AtomicOrdering::Relaxed) {
            return Err(DomainError::CacheTierUnavailable(
                "in-memory shared cache is offline".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemorySharedCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemorySharedCache {
    async fn ping(&self) -> Result<(), DomainError> {
        self.check_online()
    }

    async fn get(&self, key: &str) -> Result<Option<SharedCacheHit>, DomainError> {
        self.check_online()?;
        let now = Instant::now();

        let expired = match self.values.get(key) {
            None => return Ok(None),
            Some(entry) => match entry.expires_at {
                Some(at) if at <= now => true,
                Some(at) => {
                    return Ok(Some(SharedCacheHit {
                        value: entry.value.clone(),
                        remaining_ttl: Some(at - now),
                    }))
                }
                None => {
                    return Ok(Some(SharedCacheHit {
                        value: entry.value.clone(),
                        remaining_ttl: None,
                    }))
                }
            },
        };

        if expired {
            self.values.remove(key);
        }
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Bytes,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        self.check_online()?;
        self.values.insert(
            key.to_string(),
            SharedValue {
                value,
                expires_at: deadline(Instant::now(), ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, DomainError> {
        self.check_online()?;
        let removed = keys
            .iter()
            .filter(|key| {
                let value = self.values.remove(key.as_str()).is_some();
                let set = self.sets.remove(key.as_str()).is_some();
                value || set
            })
            .count();
        Ok(removed as u64)
    }

    async fn add_to_set(
        &self,
        set_key: &str,
        member: &str,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        self.check_online()?;
        let now = Instant::now();
        let expires_at = deadline(now, ttl);

        let mut set = self
            .sets
            .entry(set_key.to_string())
            .or_insert_with(|| SharedSet {
                members: FxHashSet::default(),
                expires_at,
            });
        if set.expires_at.is_some_and(|at| at <= now) {
            set.members.clear();
            set.expires_at = expires_at;
        }
        set.expires_at = match (set.expires_at, expires_at) {
            (Some(current), Some(new)) => Some(current.max(new)),
            _ => None,
        };
        set.members.insert(member.to_string());
        Ok(())
    }

    async fn set_members(&self, set_key: &str) -> Result<Vec<String>, DomainError> {
        self.check_online()?;
        let now = Instant::now();

        let expired = match self.sets.get(set_key) {
            None => return Ok(Vec::new()),
            Some(set) if set.expires_at.is_some_and(|at| at <= now) => true,
            Some(set) => return Ok(set.members.iter().cloned().collect()),
        };

        if expired {
            self.sets.remove(set_key);
        }
        Ok(Vec::new())
    }
}
