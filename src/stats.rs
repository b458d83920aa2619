//! Cache usage counters.

/// Snapshot of the cache's monotonic counters.
///
/// Counters only ever grow; [`Cache::clear`](crate::Cache::clear) does not
/// reset them. Obtained from [`Cache::stats`](crate::Cache::stats), which
/// copies the live counters under the cache lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries removed to enforce the size or memory bound.
    pub evicted_keys: u64,
    /// Entries removed because their expiration had passed.
    pub expired_keys: u64,
}
