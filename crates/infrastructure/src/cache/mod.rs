pub mod lru;
pub mod manager;
pub mod shared_memory;

pub use lru::{clamp_ttl, CacheEntry, LruCache, MAX_TTL, MIN_TTL};
pub use manager::CacheManager;
pub use shared_memory::InMemorySharedCache;
