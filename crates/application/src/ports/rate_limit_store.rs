use async_trait::async_trait;
use quire_domain::DomainError;

/// Result of one atomic prune + count + conditional record on a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOutcome {
    pub admitted: bool,
    /// Entries in the window after the operation, including the new one when admitted.
    pub count: u32,
    /// Timestamp (unix millis) of the oldest entry still in the window.
    pub oldest_ms: Option<u64>,
}

/// Shared store holding one timestamped membership per admitted request.
///
/// `record_in_window` must be atomic per key across processes: drop entries
/// older than `now_ms - window_ms`, count the rest, and record `now_ms` only
/// when the count is below `limit`.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn record_in_window(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        limit: u32,
    ) -> Result<WindowOutcome, DomainError>;

    /// Drop entries older than `now_ms - window_ms` from every key and forget
    /// keys left empty. Returns how many keys were forgotten. Stores that
    /// expire keys on their own keep the default.
    async fn sweep_stale(&self, _now_ms: u64, _window_ms: u64) -> Result<usize, DomainError> {
        Ok(0)
    }
}
