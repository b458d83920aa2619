//! keystash: bounded in-memory key-value cache with per-entry TTL,
//! FIFO/LRU/LFU eviction, and background expiry.
//!
//! ```
//! use std::time::Duration;
//!
//! use keystash::{Cache, EvictionPolicy};
//!
//! let cache: Cache<String> = Cache::<String>::builder()
//!     .max_size(10_000)
//!     .eviction_policy(EvictionPolicy::Lru)
//!     .build();
//!
//! cache.set("user:1", "alice".to_string());
//! cache.set_with_ttl("otp:1", "924871".to_string(), Some(Duration::from_secs(60)));
//! assert_eq!(cache.get("user:1").as_deref(), Some("alice"));
//! ```

pub mod cache;
pub mod config;
pub mod ds;
pub mod error;
pub mod pattern;
pub mod stats;
pub mod weight;

pub mod prelude;

pub use cache::Cache;
pub use config::{
    CacheBuilder, DEFAULT_MAX_SIZE, EvictionPolicy, GIGABYTE, KILOBYTE, MEGABYTE, NO_MAX_MEMORY,
    NO_MAX_SIZE,
};
pub use error::CacheError;
pub use pattern::match_pattern;
pub use stats::Statistics;
pub use weight::{ByteSize, FIELD_OVERHEAD};
