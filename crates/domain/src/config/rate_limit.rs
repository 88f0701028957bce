use crate::ClientType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-client-type sliding window quotas
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Window width in seconds (default: 60)
    #[serde(default = "default_window")]
    pub window_seconds: u64,

    /// Quota for client types missing from `limits` (default: 60)
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Requests per window keyed by client type name
    /// (default: web=100, mobile=150, mobile-ios=150, mobile-android=150)
    #[serde(default = "default_limits")]
    pub limits: BTreeMap<String, u32>,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn limit_for(&self, client_type: &ClientType) -> u32 {
        self.limits
            .get(client_type.as_str())
            .copied()
            .unwrap_or(self.default_limit)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window(),
            default_limit: default_limit(),
            limits: default_limits(),
        }
    }
}

fn default_window() -> u64 {
    60
}

fn default_limit() -> u32 {
    60
}

fn default_limits() -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("web".to_string(), 100),
        ("mobile".to_string(), 150),
        ("mobile-ios".to_string(), 150),
        ("mobile-android".to_string(), 150),
    ])
}
