//! Cache core: primary index, recency chain, frequency index, bounds, and
//! statistics behind a single lock.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────────────────────────────────────────┐
//!   │                       Cache<V>                                  │
//!   │                                                                 │
//!   │   Arc<RwLock<CacheCore<V>>>          Mutex<Option<Janitor>>    │
//!   │            │                                                    │
//!   │            ▼                                                    │
//!   │   ┌─────────────────────────────────────────────────────────┐  │
//!   │   │ CacheCore<V>                                            │  │
//!   │   │                                                         │  │
//!   │   │   index: FxHashMap<String, EntryId>                     │  │
//!   │   │            │                                            │  │
//!   │   │            ▼                                            │  │
//!   │   │   chain: RecencyList<Entry<V>>                          │  │
//!   │   │     head ─► [MRU] ◄──► ... ◄──► [LRU] ◄── tail          │  │
//!   │   │                                                         │  │
//!   │   │   freqs: FrequencyBuckets<EntryId>     (LFU only)       │  │
//!   │   │   memory_usage, bounds, stats                           │  │
//!   │   └─────────────────────────────────────────────────────────┘  │
//!   └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating operation takes the write lock end to end, so the three
//! indexes always agree from the outside. That includes `get`, which bumps
//! counters, can delete an expired entry, and promotes under LRU.
//! `count`, `stats`, and the plain accessors take the read lock. The
//! janitor thread competes for the same write lock one bounded slice at a
//! time (see [`Cache::start_janitor`]).
//!
//! Values are handed out as clones; callers never hold references into the
//! cache, so entry lifetimes stay private to the core.

mod entry;
pub(crate) mod janitor;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::cache::entry::{Entry, expiration_from_ttl};
use crate::cache::janitor::JanitorHandle;
use crate::config::{CacheBuilder, EvictionPolicy, NO_MAX_MEMORY, NO_MAX_SIZE};
use crate::ds::{EntryId, FrequencyBuckets, RecencyList};
use crate::error::CacheError;
use crate::pattern::match_pattern;
use crate::stats::Statistics;
use crate::weight::ByteSize;

/// Thread-safe, bounded, in-memory key-value cache with per-entry TTL.
///
/// Keys are strings; values are any `Clone` type. Reads return clones.
/// Capacity is enforced by entry count and, optionally, by approximate
/// memory usage, with FIFO, LRU, or LFU victim selection. Expired entries
/// are reclaimed lazily on access or in the background by the
/// [janitor](Cache::start_janitor).
///
/// ## Example
///
/// ```
/// use std::time::Duration;
///
/// use keystash::Cache;
///
/// let cache: Cache<String> = Cache::new();
/// cache.set("session", "token".to_string());
/// cache.set_with_ttl("flash", "gone soon".to_string(), Some(Duration::from_secs(30)));
///
/// assert_eq!(cache.get("session"), Some("token".to_string()));
/// assert_eq!(cache.get("missing"), None);
/// ```
pub struct Cache<V> {
    pub(crate) core: Arc<RwLock<CacheCore<V>>>,
    pub(crate) janitor: Mutex<Option<JanitorHandle>>,
}

pub(crate) struct CacheCore<V> {
    pub(crate) max_size: usize,
    pub(crate) max_memory: usize,
    pub(crate) policy: EvictionPolicy,
    pub(crate) debug: bool,
    pub(crate) index: FxHashMap<String, EntryId>,
    pub(crate) chain: RecencyList<Entry<V>>,
    pub(crate) freqs: FrequencyBuckets<EntryId>,
    pub(crate) memory_usage: usize,
    pub(crate) stats: Statistics,
}

impl<V> Cache<V> {
    /// Creates a cache with the default configuration (see
    /// [`CacheBuilder::new`]).
    pub fn new() -> Self {
        CacheBuilder::new().build()
    }

    /// Returns a builder for a customized cache.
    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    pub(crate) fn from_builder(builder: CacheBuilder) -> Self {
        Self {
            core: Arc::new(RwLock::new(CacheCore {
                max_size: builder.max_size,
                max_memory: builder.max_memory,
                policy: builder.policy,
                debug: builder.debug,
                index: FxHashMap::default(),
                chain: RecencyList::new(),
                freqs: FrequencyBuckets::new(),
                memory_usage: 0,
                stats: Statistics::default(),
            })),
            janitor: Mutex::new(None),
        }
    }

    /// Returns the configured entry-count ceiling
    /// ([`NO_MAX_SIZE`](crate::NO_MAX_SIZE) if unbounded).
    pub fn max_size(&self) -> usize {
        self.core.read().max_size
    }

    /// Returns the configured memory ceiling in bytes
    /// ([`NO_MAX_MEMORY`](crate::NO_MAX_MEMORY) if disabled).
    pub fn max_memory(&self) -> usize {
        self.core.read().max_memory
    }

    /// Returns the configured eviction policy.
    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.core.read().policy
    }

    /// Returns the approximate memory usage of the stored entries in bytes.
    ///
    /// Stays 0 when no memory bound is configured, because sizes are not
    /// estimated at all in that case.
    pub fn memory_usage(&self) -> usize {
        self.core.read().memory_usage
    }

    /// Returns the number of stored entries, including entries whose
    /// expiration has passed but which have not been reclaimed yet.
    pub fn count(&self) -> usize {
        self.core.read().index.len()
    }

    /// Returns a snapshot of the usage counters.
    pub fn stats(&self) -> Statistics {
        self.core.read().stats
    }

    /// Removes `key` from the cache. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.core.write().delete_key(key)
    }

    /// Removes every key in `keys`. Returns how many were present.
    pub fn delete_all<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut core = self.core.write();
        keys.into_iter()
            .filter(|key| core.delete_key(key.as_ref()))
            .count()
    }

    /// Removes every live key matching `pattern` (see
    /// [`match_pattern`](crate::pattern::match_pattern)). Returns how many
    /// were removed. Not atomic with respect to concurrent writers.
    pub fn delete_keys_by_pattern(&self, pattern: &str) -> usize {
        self.delete_all(self.get_keys_by_pattern(pattern, 0))
    }

    /// Returns the keys of live entries matching `pattern`, up to `limit`
    /// (0 means unlimited). Expired entries are skipped but not deleted,
    /// and nothing counts as an access: no counters move, no entry is
    /// promoted. Iteration order is unspecified.
    pub fn get_keys_by_pattern(&self, pattern: &str, limit: usize) -> Vec<String> {
        let core = self.core.read();
        let mut matching = Vec::new();
        for (key, &id) in &core.index {
            if core.chain.get(id).is_some_and(|entry| entry.expired()) {
                continue;
            }
            if match_pattern(pattern, key) {
                matching.push(key.clone());
                if limit > 0 && matching.len() >= limit {
                    break;
                }
            }
        }
        matching
    }

    /// Drops every entry and resets memory accounting. Statistics are kept.
    pub fn clear(&self) {
        let mut core = self.core.write();
        core.index.clear();
        core.chain.clear();
        core.freqs.clear();
        core.memory_usage = 0;
    }

    /// Returns the remaining time-to-live of `key`.
    ///
    /// Fails with [`CacheError::KeyNotFound`] if the key is absent or its
    /// expiration has already passed, and with
    /// [`CacheError::KeyHasNoExpiration`] if the entry never expires.
    pub fn ttl(&self, key: &str) -> Result<Duration, CacheError> {
        let core = self.core.read();
        let id = core.index.get(key).copied().ok_or(CacheError::KeyNotFound)?;
        let entry = core.chain.get(id).expect("indexed entry missing");
        match entry.expiration {
            None => Err(CacheError::KeyHasNoExpiration),
            Some(at) => {
                let now = Instant::now();
                if at <= now {
                    // Already expired, just not reclaimed yet; callers
                    // cannot tell this apart from an absent key.
                    Err(CacheError::KeyNotFound)
                } else {
                    Ok(at - now)
                }
            },
        }
    }

    /// Re-arms or disarms the expiration of `key`. `None` makes the entry
    /// permanent; `Some(ttl)` schedules expiry at now + `ttl`.
    ///
    /// Returns `false` without modification if the key is absent or already
    /// expired. Changing a TTL is not an access: the entry is not promoted
    /// under LRU and no frequency is recorded.
    pub fn expire(&self, key: &str, ttl: Option<Duration>) -> bool {
        let mut core = self.core.write();
        let Some(id) = core.index.get(key).copied() else {
            return false;
        };
        let Some(entry) = core.chain.get_mut(id) else {
            return false;
        };
        if entry.expired() {
            return false;
        }
        entry.expiration = expiration_from_ttl(ttl);
        true
    }
}

impl<V> Cache<V>
where
    V: ByteSize,
{
    /// Creates or replaces `key` with a value that never expires.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, None)
    }

    /// Creates or replaces `key` with the given time-to-live (`None` means
    /// no expiration).
    ///
    /// A zero TTL describes an entry that would expire immediately, so it
    /// is treated as delete-if-present instead of a write. Otherwise the
    /// entry is (re)written, promoted to the head of the recency chain
    /// regardless of policy, and the size/memory bounds are enforced by
    /// evicting victims until they hold.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.core.write().set_with_ttl(key.into(), value, ttl)
    }

    /// Creates or replaces each pair in `entries`, without expiration.
    /// Applied as a sequence of [`set`](Cache::set) calls; not atomic.
    pub fn set_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, V)>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }
}

impl<V> Cache<V>
where
    V: Clone,
{
    /// Returns the value stored under `key`, or `None` if the key is absent
    /// or expired (an expired entry is deleted on the way out).
    ///
    /// A hit counts as an access: under LRU the entry is promoted to the
    /// head of the recency chain, under LFU its frequency is bumped.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut core = self.core.write();
        let Some(id) = core.index.get(key).copied() else {
            core.stats.misses += 1;
            return None;
        };
        if core.chain.get(id).is_some_and(|entry| entry.expired()) {
            core.stats.expired_keys += 1;
            core.delete_key(key);
            return None;
        }
        core.stats.hits += 1;
        match core.policy {
            EvictionPolicy::Lru => {
                if let Some(entry) = core.chain.get_mut(id) {
                    entry.accessed();
                }
                core.chain.move_to_head(id);
            },
            EvictionPolicy::Lfu => core.record_access(id),
            EvictionPolicy::Fifo => {},
        }
        core.chain.get(id).map(|entry| entry.value.clone())
    }

    /// Looks up every key in `keys` with [`get`](Cache::get) semantics
    /// (including LRU promotion and expired-entry deletion).
    ///
    /// The returned map contains every requested key; `None` marks a key
    /// that was absent or expired, which keeps it distinguishable from a
    /// stored value.
    pub fn get_by_keys<I, S>(&self, keys: I) -> HashMap<String, Option<V>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), self.get(key))
            })
            .collect()
    }

    /// Returns every live entry as a key-to-value map.
    ///
    /// Expired entries encountered along the way are deleted. Unlike
    /// [`get`](Cache::get) this does not promote anything under LRU:
    /// promoting every entry at once would erase the recency signal the
    /// policy relies on. The hit counter increases by the number of entries
    /// returned.
    pub fn get_all(&self) -> HashMap<String, V> {
        let mut core = self.core.write();
        let mut entries = HashMap::with_capacity(core.index.len());
        let mut expired = Vec::new();
        for (key, &id) in &core.index {
            let entry = core.chain.get(id).expect("indexed entry missing");
            if entry.expired() {
                expired.push(key.clone());
            } else {
                entries.insert(key.clone(), entry.value.clone());
            }
        }
        for key in &expired {
            core.delete_key(key);
        }
        core.stats.hits += entries.len() as u64;
        entries
    }
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheCore<V> {
    fn set_with_ttl(&mut self, key: String, value: V, ttl: Option<Duration>)
    where
        V: ByteSize,
    {
        // A zero TTL describes an entry that expires on arrival: never
        // create it, and delete any previous incarnation.
        let dead_on_arrival = ttl.is_some_and(|ttl| ttl.is_zero());
        match self.index.get(&key).copied() {
            None => {
                if dead_on_arrival {
                    return;
                }
                let weight = self.weigh(&key, &value);
                let id = self.chain.push_head(Entry::new(key.clone(), value, ttl, weight));
                self.index.insert(key, id);
                self.memory_usage += weight;
                self.enforce_bounds();
                if self.policy == EvictionPolicy::Lfu && self.chain.contains(id) {
                    self.record_access(id);
                }
            },
            Some(id) => {
                if dead_on_arrival {
                    self.delete_key(&key);
                    return;
                }
                let weight = self.weigh(&key, &value);
                let expiration = expiration_from_ttl(ttl);
                let entry = self.chain.get_mut(id).expect("indexed entry missing");
                let old_weight = entry.weight;
                entry.value = value;
                entry.accessed();
                entry.expiration = expiration;
                entry.weight = weight;
                self.memory_usage -= old_weight;
                self.memory_usage += weight;
                // An update counts as a fresh insertion for ordering.
                self.chain.move_to_head(id);
                self.enforce_bounds();
                if self.policy == EvictionPolicy::Lfu && self.chain.contains(id) {
                    self.record_access(id);
                }
            },
        }
    }

    pub(crate) fn delete_key(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(id) => {
                if self.policy == EvictionPolicy::Lfu {
                    self.freqs.remove(id);
                }
                let entry = self.chain.remove(id).expect("indexed entry missing");
                self.memory_usage -= entry.weight;
                true
            },
            None => false,
        }
    }

    /// Records one access against the frequency index; first access files
    /// the entry into the count-1 bucket.
    fn record_access(&mut self, id: EntryId) {
        if self.freqs.touch(id).is_none() {
            self.freqs.insert(id);
        }
    }

    /// Removes one round of victims: the tail under FIFO/LRU, the whole
    /// lowest-count bucket under LFU.
    fn evict(&mut self) {
        if self.policy == EvictionPolicy::Lfu {
            for id in self.freqs.take_min_bucket() {
                let entry = self.chain.remove(id).expect("frequency member missing from chain");
                self.index.remove(&entry.key);
                self.memory_usage -= entry.weight;
                self.stats.evicted_keys += 1;
            }
            return;
        }
        if let Some(id) = self.chain.tail_id() {
            let entry = self.chain.remove(id).expect("tail entry missing");
            self.index.remove(&entry.key);
            self.memory_usage -= entry.weight;
            self.stats.evicted_keys += 1;
        }
    }

    fn enforce_bounds(&mut self) {
        if self.max_size != NO_MAX_SIZE && self.index.len() > self.max_size {
            self.evict();
        }
        if self.max_memory != NO_MAX_MEMORY {
            // The bound is advisory: a single entry larger than the whole
            // budget evicts everything else and stays.
            while self.memory_usage > self.max_memory && self.index.len() > 1 {
                self.evict();
            }
        }
    }

    fn weigh(&self, key: &str, value: &V) -> usize
    where
        V: ByteSize,
    {
        if self.max_memory == NO_MAX_MEMORY {
            0
        } else {
            key.byte_size() + value.byte_size()
        }
    }

    #[cfg(test)]
    pub(crate) fn debug_validate_invariants(&self) {
        self.chain.debug_validate_invariants();
        assert_eq!(self.index.len(), self.chain.len());
        for (key, &id) in &self.index {
            let entry = self.chain.get(id).expect("indexed entry missing");
            assert_eq!(&entry.key, key);
        }
        match self.policy {
            EvictionPolicy::Lfu => {
                self.freqs.debug_validate_invariants();
                assert_eq!(self.freqs.len(), self.index.len());
                for &id in self.index.values() {
                    assert!(self.freqs.contains(id));
                }
            },
            _ => assert!(self.freqs.is_empty()),
        }
        if self.max_memory == NO_MAX_MEMORY {
            assert_eq!(self.memory_usage, 0);
        } else {
            let total: usize = self.chain.iter().map(|entry| entry.weight).sum();
            assert_eq!(self.memory_usage, total);
        }
    }
}
