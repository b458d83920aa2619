//! Background reclamation of expired entries.
//!
//! The janitor is a single thread that periodically walks the recency chain
//! from tail toward head and deletes every expired entry it finds. Each
//! tick holds the cache lock for one bounded slice (at most
//! [`MAX_ITERATIONS_PER_SHIFT`] nodes visited or [`SHIFT_TARGET`] expired
//! entries removed), then sleeps, so foreground operations are never
//! starved behind a full sweep.
//!
//! Between slices the walk position is carried in a cursor rather than
//! restarting at the tail every tick. The cursor is only trusted if the
//! primary index still maps its key to the same slot handle; a deleted,
//! evicted, or replaced entry fails that check and the walk restarts from
//! the tail. Ticks that find nothing back off exponentially up to
//! [`MAX_SHIFT_BACK_OFF`]; any expired entry found resets the pace to
//! [`MIN_SHIFT_BACK_OFF`].
//!
//! Without a running janitor, expired entries are reclaimed only when a
//! lookup touches them.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::{Cache, CacheCore};
use crate::ds::EntryId;
use crate::error::CacheError;

/// Expired entries to find in one slice before pausing.
pub(crate) const SHIFT_TARGET: u32 = 25;

/// Nodes to visit in one slice before pausing, found or not. Keeps a slice
/// from degenerating into a full walk of a large cache.
pub(crate) const MAX_ITERATIONS_PER_SHIFT: u32 = 1000;

/// Shortest pause between slices.
pub(crate) const MIN_SHIFT_BACK_OFF: Duration = Duration::from_millis(50);

/// Longest pause between slices.
pub(crate) const MAX_SHIFT_BACK_OFF: Duration = Duration::from_millis(500);

/// Handle to the running janitor thread.
pub(crate) struct JanitorHandle {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

impl<V> Cache<V>
where
    V: Send + Sync + 'static,
{
    /// Starts the background janitor.
    ///
    /// Fails with [`CacheError::JanitorAlreadyRunning`] if it is already
    /// active. The thread keeps running until [`stop_janitor`] is called or
    /// the cache is dropped.
    ///
    /// [`stop_janitor`]: Cache::stop_janitor
    pub fn start_janitor(&self) -> Result<(), CacheError> {
        let mut slot = self.janitor.lock();
        if slot.is_some() {
            return Err(CacheError::JanitorAlreadyRunning);
        }
        let (stop_tx, stop_rx) = mpsc::channel();
        let core = Arc::clone(&self.core);
        let thread = thread::spawn(move || janitor_loop(core, stop_rx));
        *slot = Some(JanitorHandle { stop_tx, thread });
        Ok(())
    }
}

impl<V> Cache<V> {
    /// Stops the background janitor and waits for it to acknowledge by
    /// exiting. A no-op if the janitor is not running.
    pub fn stop_janitor(&self) {
        let handle = self.janitor.lock().take();
        if let Some(JanitorHandle { stop_tx, thread }) = handle {
            // The janitor may already have observed a disconnect; either
            // way the join below is the acknowledgment.
            let _ = stop_tx.send(());
            let _ = thread.join();
        }
    }
}

fn janitor_loop<V>(core: Arc<RwLock<CacheCore<V>>>, stop_rx: Receiver<()>) {
    // Resume point carried between slices: the key and handle of the next
    // node to visit.
    let mut cursor: Option<(String, EntryId)> = None;
    let mut backoff = MIN_SHIFT_BACK_OFF;
    // Expired entries found since the walk last started at the tail.
    let mut sweep_expired: u64 = 0;

    loop {
        match stop_rx.recv_timeout(backoff) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {},
        }

        let mut core = core.write();
        if core.chain.is_empty() {
            backoff = double_capped(backoff);
            continue;
        }

        let slice_start = Instant::now();
        let tail = core.chain.tail_id();
        let mut current = cursor
            .take()
            .filter(|(key, id)| core.index.get(key) == Some(id))
            .map(|(_, id)| id)
            .or(tail);

        if current == tail {
            if core.debug {
                debug!(
                    entries = core.index.len(),
                    expired_last_sweep = sweep_expired,
                    "expiry walk starting from tail"
                );
            }
            sweep_expired = 0;
        }

        let mut steps: u32 = 0;
        let mut found: u32 = 0;
        while let Some(id) = current {
            steps += 1;
            // Deleting unlinks the node, so capture the head check and the
            // next position first.
            let at_head = core.chain.head_id() == Some(id);
            let prev = core.chain.prev_of(id);

            let expired_key = core
                .chain
                .get(id)
                .filter(|entry| entry.expired())
                .map(|entry| entry.key.clone());
            if let Some(key) = expired_key {
                core.delete_key(&key);
                core.stats.expired_keys += 1;
                found += 1;
                sweep_expired += 1;
            }

            if at_head {
                current = None;
                break;
            }
            current = prev;
            if steps >= MAX_ITERATIONS_PER_SHIFT || found >= SHIFT_TARGET {
                break;
            }
        }

        cursor = current.and_then(|id| core.chain.get(id).map(|entry| (entry.key.clone(), id)));
        backoff = if found > 0 {
            MIN_SHIFT_BACK_OFF
        } else {
            double_capped(backoff)
        };

        if core.debug {
            debug!(
                steps,
                found,
                elapsed_us = slice_start.elapsed().as_micros() as u64,
                "expiry walk slice finished"
            );
        }
    }
}

fn double_capped(backoff: Duration) -> Duration {
    (backoff * 2).min(MAX_SHIFT_BACK_OFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = MIN_SHIFT_BACK_OFF;
        backoff = double_capped(backoff);
        assert_eq!(backoff, Duration::from_millis(100));
        backoff = double_capped(backoff);
        backoff = double_capped(backoff);
        assert_eq!(backoff, Duration::from_millis(400));
        backoff = double_capped(backoff);
        assert_eq!(backoff, MAX_SHIFT_BACK_OFF);
        backoff = double_capped(backoff);
        assert_eq!(backoff, MAX_SHIFT_BACK_OFF);
    }

    #[test]
    fn start_twice_reports_already_running() {
        let cache: Cache<&str> = Cache::new();
        assert!(cache.start_janitor().is_ok());
        assert_eq!(
            cache.start_janitor(),
            Err(CacheError::JanitorAlreadyRunning)
        );
        cache.stop_janitor();
    }

    #[test]
    fn stop_without_start_is_a_noop() {
        let cache: Cache<&str> = Cache::new();
        cache.stop_janitor();
        cache.stop_janitor();
    }

    #[test]
    fn janitor_can_be_restarted_after_stop() {
        let cache: Cache<&str> = Cache::new();
        assert!(cache.start_janitor().is_ok());
        cache.stop_janitor();
        assert!(cache.start_janitor().is_ok());
        cache.stop_janitor();
    }

    #[test]
    fn janitor_reclaims_expired_entries() {
        let cache: Cache<String> = Cache::<String>::builder().max_size(0).build();
        cache.start_janitor().unwrap();
        for n in 0..100 {
            cache.set_with_ttl(n.to_string(), "v".to_string(), Some(Duration::from_millis(1)));
        }
        // First tick lands after ~50ms and each slice reclaims up to 25
        // expired entries at the reset minimum back-off.
        std::thread::sleep(Duration::from_millis(400));
        assert_eq!(cache.count(), 0);
        assert_eq!(cache.stats().expired_keys, 100);
        cache.stop_janitor();
    }

    #[test]
    fn janitor_leaves_live_entries_alone() {
        let cache: Cache<&str> = Cache::new();
        cache.set("permanent", "value");
        cache.set_with_ttl("brief", "value", Some(Duration::from_millis(1)));
        cache.start_janitor().unwrap();
        std::thread::sleep(Duration::from_millis(150));
        cache.stop_janitor();

        assert_eq!(cache.get("permanent"), Some("value"));
        assert_eq!(cache.count(), 1);
        assert_eq!(cache.stats().expired_keys, 1);
    }
}
