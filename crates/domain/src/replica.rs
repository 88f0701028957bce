use serde::{Deserialize, Serialize};
use std::fmt;

/// Health and load snapshot for one read replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaInfo {
    pub host: String,
    pub port: u16,
    pub is_healthy: bool,
    pub replication_lag_seconds: f64,
    pub weight: u32,
    pub cpu_utilization: f64,
    pub avg_response_time_ms: f64,
}

impl ReplicaInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            is_healthy: true,
            replication_lag_seconds: 0.0,
            weight: 1,
            cpu_utilization: 0.0,
            avg_response_time_ms: 0.0,
        }
    }

    pub fn with_lag(mut self, lag_seconds: f64) -> Self {
        self.replication_lag_seconds = lag_seconds;
        self
    }

    pub fn with_health(mut self, healthy: bool) -> Self {
        self.is_healthy = healthy;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Replica identifier used by lag checkers: `host:port`.
    pub fn id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether this replica may serve reads under the given lag bound.
    pub fn is_eligible(&self, max_replica_lag: f64) -> bool {
        self.is_healthy
            && self.replication_lag_seconds.is_finite()
            && self.replication_lag_seconds <= max_replica_lag
    }
}

/// Replica snapshot as reported by `get_replica_status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicaStatus {
    pub id: String,
    pub info: ReplicaInfo,
    pub eligible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Primary,
    Replica,
}

/// Why the isolator picked a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    WriteOperation,
    UnknownOperation,
    CriticalPriority,
    LowestLagReplica,
    NoHealthyReplica,
}

impl RouteReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteOperation => "write operation",
            Self::UnknownOperation => "unclassified operation treated as write",
            Self::CriticalPriority => "critical priority requires primary",
            Self::LowestLagReplica => "lowest lag healthy replica",
            Self::NoHealthyReplica => "no healthy replica",
        }
    }
}

impl fmt::Display for RouteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteTarget {
    pub target_type: TargetType,
    pub host: String,
    pub port: u16,
    pub reason: RouteReason,
}

impl RouteTarget {
    pub fn is_primary(&self) -> bool {
        self.target_type == TargetType::Primary
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum QueryPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Read,
    Write,
    Unknown,
}

/// A statement submitted for routing. Only `text` is inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
