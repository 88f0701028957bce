use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use quire_application::ports::{RateLimitStore, RateLimitSweeper};
use quire_domain::config::RateLimitConfig;
use quire_domain::{ClientType, DomainError, RateLimitResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// The client name is length-prefixed so a `:` in either part cannot make
/// two different pairs share a window.
fn window_key(client_type: &ClientType, user_id: &str) -> String {
    let client = client_type.as_str();
    format!("ratelimit:{}:{client}:{user_id}", client.len())
}

/// Per-user sliding-window quotas, keyed by client type.
pub struct MobileRateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
}

impl MobileRateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn get_rate_limit(&self, client_type: &ClientType) -> u32 {
        self.config.limit_for(client_type)
    }

    pub async fn check_user_limit(&self, user_id: &str, client_type: &ClientType) -> RateLimitResult {
        self.check_at(user_id, client_type, Utc::now()).await
    }

    /// Run one admission check as of `now`. Store failures admit the request.
    pub async fn check_at(
        &self,
        user_id: &str,
        client_type: &ClientType,
        now: DateTime<Utc>,
    ) -> RateLimitResult {
        let limit = self.get_rate_limit(client_type);
        let window_ms = self.config.window_seconds.saturating_mul(1000);
        let now_ms = now.timestamp_millis().max(0) as u64;
        let key = window_key(client_type, user_id);

        let outcome = match self
            .store
            .record_in_window(&key, now_ms, window_ms, limit)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(key = %key, error = %e, "Rate limit store unavailable, admitting request");
                let reset_at = now + ChronoDuration::milliseconds(window_ms as i64);
                return RateLimitResult::allowed(limit, limit.saturating_sub(1), reset_at);
            }
        };

        let reset_ms = outcome.oldest_ms.unwrap_or(now_ms).saturating_add(window_ms);
        let reset_at = DateTime::from_timestamp_millis(reset_ms as i64).unwrap_or(now);

        if outcome.admitted {
            return RateLimitResult::allowed(limit, limit.saturating_sub(outcome.count), reset_at);
        }

        let retry_after = reset_ms.saturating_sub(now_ms).div_ceil(1000);
        debug!(
            key = %key,
            limit,
            retry_after_secs = retry_after,
            "Rate limit exceeded"
        );
        RateLimitResult::rejected(limit, reset_at, retry_after)
    }

    pub async fn allow_request(&self, user_id: &str, is_admin: bool, client_type: &ClientType) -> bool {
        if is_admin {
            return true;
        }
        self.check_user_limit(user_id, client_type).await.allowed
    }

    /// Like [`allow_request`](Self::allow_request) but fails with
    /// `RateLimitExceeded`. Admins get `Ok(None)` since no check ran.
    pub async fn enforce(
        &self,
        user_id: &str,
        is_admin: bool,
        client_type: &ClientType,
    ) -> Result<Option<RateLimitResult>, DomainError> {
        if is_admin {
            return Ok(None);
        }
        let result = self.check_user_limit(user_id, client_type).await;
        if result.allowed {
            Ok(Some(result))
        } else {
            Err(DomainError::RateLimitExceeded {
                limit: result.limit,
                retry_after_secs: result.retry_after_seconds.unwrap_or(1),
            })
        }
    }

    /// Forget windows with no entry newer than one window before `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let window_ms = self.config.window_seconds.saturating_mul(1000);
        let now_ms = now.timestamp_millis().max(0) as u64;
        match self.store.sweep_stale(now_ms, window_ms).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Rate limit sweep failed");
                0
            }
        }
    }
}

#[async_trait]
impl RateLimitSweeper for MobileRateLimiter {
    async fn sweep_stale_windows(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }
}
