use chrono::{DateTime, Utc};
use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Client family used to pick a quota. Unrecognized values keep their
/// original spelling and get the default quota.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientType {
    Web,
    MobileIos,
    MobileAndroid,
    Mobile,
    Other(String),
}

impl ClientType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Web => "web",
            Self::MobileIos => "mobile-ios",
            Self::MobileAndroid => "mobile-android",
            Self::Mobile => "mobile",
            Self::Other(name) => name,
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, Self::MobileIos | Self::MobileAndroid | Self::Mobile)
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ClientType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "web" => Self::Web,
            "mobile-ios" | "mobile_ios" | "ios" => Self::MobileIos,
            "mobile-android" | "mobile_android" | "android" => Self::MobileAndroid,
            "mobile" => Self::Mobile,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Every string names some client, so parsing never fails.
impl FromStr for ClientType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Outcome of one admission check. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub retry_after_seconds: Option<u64>,
}

impl RateLimitResult {
    pub fn allowed(limit: u32, remaining: u32, reset_at: DateTime<Utc>) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at,
            retry_after_seconds: None,
        }
    }

    pub fn rejected(limit: u32, reset_at: DateTime<Utc>, retry_after_seconds: u64) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at,
            retry_after_seconds: Some(retry_after_seconds.max(1)),
        }
    }

    /// Header pairs for the web layer: limit, remaining, reset (unix seconds)
    /// and `Retry-After` on rejection.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_at.timestamp().to_string()),
        ];
        if let Some(retry_after) = self.retry_after_seconds {
            headers.push(("Retry-After", retry_after.to_string()));
        }
        headers
    }
}
