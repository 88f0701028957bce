pub mod cache_compaction;
pub mod idle_reaper;
pub mod lag_monitor;
pub mod rate_limit_sweep;
pub mod runner;

pub use cache_compaction::CacheCompactionJob;
pub use idle_reaper::IdleConnectionReaperJob;
pub use lag_monitor::ReplicaLagMonitorJob;
pub use rate_limit_sweep::RateLimitSweepJob;
pub use runner::JobRunner;
