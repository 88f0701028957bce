use crate::ReplicaInfo;
use serde::{Deserialize, Serialize};

/// One configured read replica
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplicaEndpoint {
    pub host: String,

    pub port: u16,

    /// Informational weight reported in replica status (default: 1)
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl ReplicaEndpoint {
    pub fn to_info(&self) -> ReplicaInfo {
        ReplicaInfo::new(self.host.clone(), self.port).with_weight(self.weight)
    }
}

/// Primary and replica topology used by the workload isolator
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplicaConfig {
    #[serde(default = "default_primary_host")]
    pub primary_host: String,

    #[serde(default = "default_primary_port")]
    pub primary_port: u16,

    /// Replicas lagging more than this many seconds are skipped (default: 5.0)
    #[serde(default = "default_max_replica_lag")]
    pub max_replica_lag: f64,

    /// Replicas in preference order; ties on lag resolve to the earlier entry
    #[serde(default)]
    pub servers: Vec<ReplicaEndpoint>,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            primary_host: default_primary_host(),
            primary_port: default_primary_port(),
            max_replica_lag: default_max_replica_lag(),
            servers: Vec::new(),
        }
    }
}

fn default_weight() -> u32 {
    1
}

fn default_primary_host() -> String {
    "127.0.0.1".to_string()
}

fn default_primary_port() -> u16 {
    5432
}

fn default_max_replica_lag() -> f64 {
    5.0
}
