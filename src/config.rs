//! Cache configuration: bounds, eviction policy, and the builder.
//!
//! ## Example
//!
//! ```
//! use keystash::{Cache, EvictionPolicy, MEGABYTE};
//!
//! let cache: Cache<String> = Cache::<String>::builder()
//!     .max_size(10_000)
//!     .max_memory(64 * MEGABYTE)
//!     .eviction_policy(EvictionPolicy::Lru)
//!     .build();
//! ```

use crate::cache::Cache;

/// Sentinel for [`CacheBuilder::max_size`]: no entry-count ceiling, no
/// size-based eviction.
pub const NO_MAX_SIZE: usize = 0;

/// Sentinel for [`CacheBuilder::max_memory`]: memory accounting and
/// memory-based eviction disabled.
pub const NO_MAX_MEMORY: usize = 0;

/// Entry-count ceiling applied when none is configured.
pub const DEFAULT_MAX_SIZE: usize = 100_000;

pub const KILOBYTE: usize = 1024;
pub const MEGABYTE: usize = 1024 * KILOBYTE;
pub const GIGABYTE: usize = 1024 * MEGABYTE;

/// Strategy for choosing eviction victims once a bound is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Evict the oldest insertion. Accesses never reorder entries.
    #[default]
    Fifo,
    /// Evict the least recently accessed entry. Reads promote to the head
    /// of the recency chain.
    Lru,
    /// Evict every entry sharing the lowest access count.
    Lfu,
}

/// Builder for [`Cache`] instances.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    pub(crate) max_size: usize,
    pub(crate) max_memory: usize,
    pub(crate) policy: EvictionPolicy,
    pub(crate) debug: bool,
}

impl CacheBuilder {
    /// Creates a builder with the default configuration: a
    /// [`DEFAULT_MAX_SIZE`] entry ceiling, no memory bound, FIFO eviction,
    /// and janitor debug logging off.
    pub fn new() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_memory: NO_MAX_MEMORY,
            policy: EvictionPolicy::default(),
            debug: false,
        }
    }

    /// Sets the maximum number of entries. [`NO_MAX_SIZE`] disables the
    /// ceiling entirely.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the approximate memory ceiling in bytes. [`NO_MAX_MEMORY`]
    /// disables memory accounting. The bound is advisory: estimates are
    /// approximate, and a single entry larger than the ceiling is allowed
    /// to remain after evicting everything else.
    pub fn max_memory(mut self, max_memory: usize) -> Self {
        self.max_memory = max_memory;
        self
    }

    /// Sets the eviction policy. Defaults to [`EvictionPolicy::Fifo`].
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enables debug logging from the janitor for this instance.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builds the cache.
    pub fn build<V>(self) -> Cache<V> {
        Cache::from_builder(self)
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
