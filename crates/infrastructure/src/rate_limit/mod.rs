pub mod limiter;
pub mod memory_store;

pub use limiter::MobileRateLimiter;
pub use memory_store::InMemoryRateLimitStore;
