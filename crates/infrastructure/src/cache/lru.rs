use bytes::Bytes;
use compact_str::CompactString;
use quire_domain::CacheStats;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Shortest TTL an entry can be stored with. Zero TTLs are clamped up to it.
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Longest TTL an entry can be stored with.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Bring a requested TTL into `[MIN_TTL, MAX_TTL]`.
pub fn clamp_ttl(ttl: Duration) -> Duration {
    ttl.clamp(MIN_TTL, MAX_TTL)
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CompactString,
    pub value: Bytes,
    pub tags: FxHashSet<CompactString>,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub last_accessed: Instant,
}

impl CacheEntry {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

struct LruState {
    entries: lru::LruCache<CompactString, CacheEntry, FxBuildHasher>,
    tag_index: FxHashMap<CompactString, FxHashSet<CompactString>>,
}

impl LruState {
    fn unindex(&mut self, entry: &CacheEntry) {
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(&entry.key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.pop(key)?;
        self.unindex(&entry);
        Some(entry)
    }
}

/// In-process tier: capacity-bounded, TTL-aware, tag-indexed.
///
/// One coarse mutex guards the entry map and the tag index together so the
/// index never points at a key the map no longer holds.
pub struct LruCache {
    state: Mutex<LruState>,
    max_size: usize,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl LruCache {
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(LruState {
                entries: lru::LruCache::unbounded_with_hasher(FxBuildHasher),
                tag_index: FxHashMap::default(),
            }),
            max_size: max_size.max(1),
            default_ttl: clamp_ttl(default_ttl),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let mut state = self.lock();

        let expired = match state.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.last_accessed = now;
                self.hits.fetch_add(1, AtomicOrdering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.remove(key);
            self.expirations.fetch_add(1, AtomicOrdering::Relaxed);
        }
        self.misses.fetch_add(1, AtomicOrdering::Relaxed);
        None
    }

    /// Time left before `key` expires, without touching its recency.
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let state = self.lock();
        state
            .entries
            .peek(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.expires_at.saturating_duration_since(now))
    }

    pub fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>, tags: &[&str]) {
        let ttl = clamp_ttl(ttl.unwrap_or(self.default_ttl));
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or(now);
        let key = CompactString::from(key);
        let entry = CacheEntry {
            key: key.clone(),
            value,
            tags: tags.iter().map(|t| CompactString::from(*t)).collect(),
            created_at: now,
            expires_at,
            last_accessed: now,
        };

        let mut state = self.lock();

        // Replacing a key is not an eviction; drop its old tags first.
        if let Some(previous) = state.entries.pop(&key) {
            state.unindex(&previous);
        }

        if state.entries.len() >= self.max_size {
            if let Some((evicted_key, evicted)) = state.entries.pop_lru() {
                state.unindex(&evicted);
                self.evictions.fetch_add(1, AtomicOrdering::Relaxed);
                debug!(key = %evicted_key, "Evicted least recently used entry");
            }
        }

        for tag in &entry.tags {
            state
                .tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        state.entries.put(key, entry);
    }

    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Remove every entry carrying at least one of `tags`. Returns how many were removed.
    pub fn delete_by_tags(&self, tags: &[&str]) -> usize {
        let mut state = self.lock();

        let keys: FxHashSet<CompactString> = tags
            .iter()
            .filter_map(|tag| state.tag_index.get(*tag))
            .flat_map(|keys| keys.iter().cloned())
            .collect();

        let removed = keys
            .iter()
            .filter(|key| state.remove(key).is_some())
            .count();

        debug!(tags = ?tags, removed, "Deleted entries by tag");
        removed
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.tag_index.clear();
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();

        let expired: Vec<CompactString> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }

        let removed = expired.len();
        self.expirations
            .fetch_add(removed as u64, AtomicOrdering::Relaxed);
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(AtomicOrdering::Relaxed);
        let misses = self.misses.load(AtomicOrdering::Relaxed);
        CacheStats {
            hits,
            misses,
            hit_rate: CacheStats::hit_rate_of(hits, misses),
            size: self.len(),
            max_size: self.max_size,
            evictions: self.evictions.load(AtomicOrdering::Relaxed),
            expirations: self.expirations.load(AtomicOrdering::Relaxed),
        }
    }
}
