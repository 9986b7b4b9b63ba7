//! Key-value store adapters.
//!
//! ## Available Adapters
//!
//! - **RedisStore** - Production store over a multiplexed Redis connection
//! - **InMemoryStore** - Map-backed store with operation counters (testing/embedding)

mod in_memory;
mod redis;

pub use in_memory::InMemoryStore;
pub use self::redis::RedisStore;
