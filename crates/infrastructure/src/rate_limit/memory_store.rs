use async_trait::async_trait;
use dashmap::DashMap;
use quire_application::ports::{RateLimitStore, WindowOutcome};
use quire_domain::DomainError;
use rustc_hash::FxBuildHasher;
use std::collections::VecDeque;

/// Sliding-window store kept in process memory.
///
/// Each key holds its admitted timestamps in ascending order. The dashmap
/// entry lock makes prune + count + record atomic per key.
pub struct InMemoryRateLimitStore {
    windows: DashMap<String, VecDeque<u64>, FxBuildHasher>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self {
            windows: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Prune entries at or before `now_ms - window_ms` in every key, then drop
    /// keys left empty. Returns how many keys were dropped.
    pub fn prune_stale(&self, now_ms: u64, window_ms: u64) -> usize {
        let cutoff = now_ms.saturating_sub(window_ms);
        let before = self.windows.len();
        self.windows.retain(|_, stamps| {
            let fresh = stamps.partition_point(|&t| t <= cutoff);
            stamps.drain(..fresh);
            !stamps.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl Default for InMemoryRateLimitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn record_in_window(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        limit: u32,
    ) -> Result<WindowOutcome, DomainError> {
        let cutoff = now_ms.saturating_sub(window_ms);
        let mut stamps = self.windows.entry(key.to_string()).or_default();

        stamps.retain(|&t| t > cutoff);

        let admitted = stamps.len() < limit as usize;
        if admitted {
            // Out-of-order callers still keep the deque sorted.
            let at = stamps.partition_point(|&t| t <= now_ms);
            stamps.insert(at, now_ms);
        }

        Ok(WindowOutcome {
            admitted,
            count: stamps.len() as u32,
            oldest_ms: stamps.front().copied(),
        })
    }

    async fn sweep_stale(&self, now_ms: u64, window_ms: u64) -> Result<usize, DomainError> {
        Ok(self.prune_stale(now_ms, window_ms))
    }
}
