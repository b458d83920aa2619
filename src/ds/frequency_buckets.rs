//! Frequency index for LFU eviction.
//!
//! Buckets group member keys by identical access count. The buckets form an
//! ordered list (counts strictly increasing, linked through `prev`/`next`
//! count links) with the minimum count tracked separately, so promoting a
//! member to the next count and draining the coldest bucket are both O(1)
//! in the number of buckets touched. Empty buckets are unlinked immediately.

use std::hash::Hash;

use rustc_hash::FxHashMap;

#[derive(Debug)]
struct Member<K> {
    key: K,
    freq: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Default)]
struct Bucket {
    head: Option<usize>,
    tail: Option<usize>,
    prev: Option<u64>,
    next: Option<u64>,
}

/// Ordered sequence of frequency buckets over copyable member keys.
#[derive(Debug)]
pub struct FrequencyBuckets<K> {
    members: Vec<Option<Member<K>>>,
    free: Vec<usize>,
    index: FxHashMap<K, usize>,
    buckets: FxHashMap<u64, Bucket>,
    min_freq: u64,
}

impl<K> FrequencyBuckets<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            free: Vec::new(),
            index: FxHashMap::default(),
            buckets: FxHashMap::default(),
            min_freq: 0,
        }
    }

    /// Returns the number of tracked members.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no members are tracked.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns `true` if `key` is tracked.
    pub fn contains(&self, key: K) -> bool {
        self.index.contains_key(&key)
    }

    /// Returns the access count recorded for `key`.
    pub fn frequency(&self, key: K) -> Option<u64> {
        let idx = *self.index.get(&key)?;
        self.member(idx).map(|member| member.freq)
    }

    /// Returns the lowest access count currently present.
    pub fn min_freq(&self) -> Option<u64> {
        if self.min_freq == 0 { None } else { Some(self.min_freq) }
    }

    /// Starts tracking `key` with an initial access count of 1.
    ///
    /// Returns `false` if the key is already tracked.
    pub fn insert(&mut self, key: K) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }

        let idx = self.alloc(Member {
            key,
            freq: 1,
            prev: None,
            next: None,
        });
        self.index.insert(key, idx);

        if !self.buckets.contains_key(&1) {
            let next = if self.min_freq == 0 {
                None
            } else {
                Some(self.min_freq)
            };
            self.link_bucket(1, None, next);
        }
        self.bucket_push(1, idx);
        if self.min_freq == 0 || self.min_freq > 1 {
            self.min_freq = 1;
        }
        true
    }

    /// Records one access for `key`, moving it to the next-count bucket.
    ///
    /// The successor bucket is reused when its count is exactly one higher;
    /// otherwise a fresh bucket is spliced in. Returns the new count, or
    /// `None` if the key is not tracked.
    pub fn touch(&mut self, key: K) -> Option<u64> {
        let idx = *self.index.get(&key)?;
        let freq = self.member(idx)?.freq;
        if freq == u64::MAX {
            return Some(freq);
        }
        let next_freq = freq + 1;

        let (bucket_prev, bucket_next) = {
            let bucket = self.buckets.get(&freq)?;
            (bucket.prev, bucket.next)
        };

        self.bucket_remove(freq, idx);
        let emptied = self.bucket_is_empty(freq);
        if emptied {
            self.unlink_bucket(freq, bucket_prev, bucket_next);
            if self.min_freq == freq {
                self.min_freq = bucket_next.unwrap_or(0);
            }
        }

        if !self.buckets.contains_key(&next_freq) {
            let prev = if emptied { bucket_prev } else { Some(freq) };
            self.link_bucket(next_freq, prev, bucket_next);
        }

        if let Some(member) = self.member_mut(idx) {
            member.freq = next_freq;
        }
        self.bucket_push(next_freq, idx);
        if self.min_freq == 0 || next_freq < self.min_freq {
            self.min_freq = next_freq;
        }

        Some(next_freq)
    }

    /// Stops tracking `key` and returns its last access count.
    pub fn remove(&mut self, key: K) -> Option<u64> {
        let idx = self.index.remove(&key)?;
        let freq = self.member(idx)?.freq;

        self.bucket_remove(freq, idx);
        if self.bucket_is_empty(freq) {
            let (prev, next) = {
                let bucket = self.buckets.get(&freq)?;
                (bucket.prev, bucket.next)
            };
            self.unlink_bucket(freq, prev, next);
            if self.min_freq == freq {
                self.min_freq = next.unwrap_or(0);
            }
        }

        Some(self.release(idx).freq)
    }

    /// Drains every member of the lowest-count bucket.
    ///
    /// All of them share the minimum access count, so no ordering among them
    /// is meaningful; the caller evicts the whole batch.
    pub fn take_min_bucket(&mut self) -> Vec<K> {
        if self.min_freq == 0 {
            return Vec::new();
        }
        let freq = self.min_freq;

        let mut drained = Vec::new();
        while let Some(idx) = self.buckets.get(&freq).and_then(|bucket| bucket.head) {
            self.bucket_remove(freq, idx);
            let member = self.release(idx);
            self.index.remove(&member.key);
            drained.push(member.key);
        }

        let next = self.buckets.get(&freq).and_then(|bucket| bucket.next);
        self.unlink_bucket(freq, None, next);
        self.min_freq = next.unwrap_or(0);
        drained
    }

    /// Forgets all members and buckets.
    pub fn clear(&mut self) {
        self.members.clear();
        self.free.clear();
        self.index.clear();
        self.buckets.clear();
        self.min_freq = 0;
    }

    fn alloc(&mut self, member: Member<K>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.members[idx] = Some(member);
                idx
            },
            None => {
                self.members.push(Some(member));
                self.members.len() - 1
            },
        }
    }

    fn release(&mut self, idx: usize) -> Member<K> {
        let member = self.members[idx].take().expect("freed frequency member");
        self.free.push(idx);
        member
    }

    fn member(&self, idx: usize) -> Option<&Member<K>> {
        self.members.get(idx).and_then(|slot| slot.as_ref())
    }

    fn member_mut(&mut self, idx: usize) -> Option<&mut Member<K>> {
        self.members.get_mut(idx).and_then(|slot| slot.as_mut())
    }

    fn bucket_is_empty(&self, freq: u64) -> bool {
        self.buckets
            .get(&freq)
            .map(|bucket| bucket.head.is_none())
            .unwrap_or(true)
    }

    fn link_bucket(&mut self, freq: u64, prev: Option<u64>, next: Option<u64>) {
        self.buckets.insert(
            freq,
            Bucket {
                head: None,
                tail: None,
                prev,
                next,
            },
        );
        if let Some(prev) = prev
            && let Some(bucket) = self.buckets.get_mut(&prev)
        {
            bucket.next = Some(freq);
        }
        if let Some(next) = next
            && let Some(bucket) = self.buckets.get_mut(&next)
        {
            bucket.prev = Some(freq);
        }
    }

    fn unlink_bucket(&mut self, freq: u64, prev: Option<u64>, next: Option<u64>) {
        if let Some(prev) = prev
            && let Some(bucket) = self.buckets.get_mut(&prev)
        {
            bucket.next = next;
        }
        if let Some(next) = next
            && let Some(bucket) = self.buckets.get_mut(&next)
        {
            bucket.prev = prev;
        }
        self.buckets.remove(&freq);
    }

    fn bucket_push(&mut self, freq: u64, idx: usize) {
        let bucket = self.buckets.get_mut(&freq).expect("bucket missing");
        let old_head = bucket.head;
        if let Some(member) = self.members.get_mut(idx).and_then(|slot| slot.as_mut()) {
            member.prev = None;
            member.next = old_head;
        }
        match old_head {
            Some(head_idx) => {
                if let Some(member) = self.members.get_mut(head_idx).and_then(|slot| slot.as_mut())
                {
                    member.prev = Some(idx);
                }
            },
            None => bucket.tail = Some(idx),
        }
        bucket.head = Some(idx);
    }

    fn bucket_remove(&mut self, freq: u64, idx: usize) {
        let (prev, next) = match self.member(idx) {
            Some(member) => (member.prev, member.next),
            None => return,
        };
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            return;
        };
        match prev {
            Some(prev_idx) => {
                if let Some(member) = self.members.get_mut(prev_idx).and_then(|slot| slot.as_mut())
                {
                    member.next = next;
                }
            },
            None => bucket.head = next,
        }
        match next {
            Some(next_idx) => {
                if let Some(member) = self.members.get_mut(next_idx).and_then(|slot| slot.as_mut())
                {
                    member.prev = prev;
                }
            },
            None => bucket.tail = prev,
        }
        if let Some(member) = self.member_mut(idx) {
            member.prev = None;
            member.next = None;
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        if self.is_empty() {
            assert!(self.buckets.is_empty());
            assert_eq!(self.min_freq, 0);
            return;
        }

        assert!(self.min_freq > 0);
        assert!(self.buckets.contains_key(&self.min_freq));

        // The bucket chain from min_freq must visit every bucket in strictly
        // increasing count order.
        let mut visited = 0usize;
        let mut tracked = 0usize;
        let mut current = Some(self.min_freq);
        let mut last: Option<u64> = None;
        while let Some(freq) = current {
            if let Some(last) = last {
                assert!(freq > last, "bucket counts must strictly increase");
            }
            let bucket = self.buckets.get(&freq).expect("linked bucket missing");
            assert_eq!(bucket.prev, last);
            assert!(bucket.head.is_some(), "empty bucket left linked");

            let mut member_prev = None;
            let mut cursor = bucket.head;
            while let Some(idx) = cursor {
                let member = self.member(idx).expect("bucket member missing");
                assert_eq!(member.freq, freq);
                assert_eq!(member.prev, member_prev);
                assert_eq!(self.index.get(&member.key), Some(&idx));
                member_prev = Some(idx);
                cursor = member.next;
                tracked += 1;
            }
            assert_eq!(bucket.tail, member_prev);

            last = Some(freq);
            current = bucket.next;
            visited += 1;
            assert!(visited <= self.buckets.len());
        }
        assert_eq!(visited, self.buckets.len());
        assert_eq!(tracked, self.index.len());
    }
}

impl<K> Default for FrequencyBuckets<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_starts_at_one() {
        let mut freqs = FrequencyBuckets::new();
        assert!(freqs.insert(1u32));
        assert!(freqs.insert(2));
        assert_eq!(freqs.frequency(1), Some(1));
        assert_eq!(freqs.min_freq(), Some(1));
        freqs.debug_validate_invariants();
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut freqs = FrequencyBuckets::new();
        assert!(freqs.insert(7u32));
        assert!(!freqs.insert(7));
        assert_eq!(freqs.len(), 1);
        assert_eq!(freqs.frequency(7), Some(1));
    }

    #[test]
    fn touch_moves_to_next_bucket() {
        let mut freqs = FrequencyBuckets::new();
        freqs.insert(1u32);
        freqs.insert(2);
        assert_eq!(freqs.touch(1), Some(2));
        assert_eq!(freqs.frequency(1), Some(2));
        assert_eq!(freqs.min_freq(), Some(1));
        freqs.debug_validate_invariants();
    }

    #[test]
    fn touch_missing_returns_none() {
        let mut freqs: FrequencyBuckets<u32> = FrequencyBuckets::new();
        assert_eq!(freqs.touch(42), None);
        assert!(freqs.is_empty());
    }

    #[test]
    fn touch_reuses_adjacent_bucket() {
        let mut freqs = FrequencyBuckets::new();
        freqs.insert(1u32);
        freqs.insert(2);
        freqs.touch(1);
        // 2 moves from the count-1 bucket into the existing count-2 bucket.
        assert_eq!(freqs.touch(2), Some(2));
        assert_eq!(freqs.min_freq(), Some(2));
        freqs.debug_validate_invariants();
    }

    #[test]
    fn remove_drops_empty_bucket_and_advances_min() {
        let mut freqs = FrequencyBuckets::new();
        freqs.insert(1u32);
        freqs.insert(2);
        freqs.touch(2);
        assert_eq!(freqs.remove(1), Some(1));
        assert_eq!(freqs.min_freq(), Some(2));
        assert!(!freqs.contains(1));
        freqs.debug_validate_invariants();
    }

    #[test]
    fn take_min_bucket_drains_all_coldest_members() {
        let mut freqs = FrequencyBuckets::new();
        freqs.insert(1u32);
        freqs.insert(2);
        freqs.insert(3);
        freqs.touch(1);
        freqs.touch(1);

        let mut drained = freqs.take_min_bucket();
        drained.sort_unstable();
        assert_eq!(drained, vec![2, 3]);
        assert_eq!(freqs.min_freq(), Some(3));
        assert_eq!(freqs.len(), 1);
        freqs.debug_validate_invariants();
    }

    #[test]
    fn take_min_bucket_on_empty_is_empty() {
        let mut freqs: FrequencyBuckets<u32> = FrequencyBuckets::new();
        assert!(freqs.take_min_bucket().is_empty());
    }

    #[test]
    fn interleaved_touches_keep_counts_strictly_increasing() {
        let mut freqs = FrequencyBuckets::new();
        for key in 0u32..8 {
            freqs.insert(key);
        }
        for key in 0..8 {
            for _ in 0..key {
                freqs.touch(key);
            }
        }
        freqs.debug_validate_invariants();
        assert_eq!(freqs.min_freq(), Some(1));
        assert_eq!(freqs.frequency(7), Some(8));

        assert_eq!(freqs.take_min_bucket(), vec![0]);
        assert_eq!(freqs.min_freq(), Some(2));
        freqs.debug_validate_invariants();
    }

    #[test]
    fn clear_resets_state() {
        let mut freqs = FrequencyBuckets::new();
        freqs.insert(1u32);
        freqs.touch(1);
        freqs.clear();
        assert!(freqs.is_empty());
        assert_eq!(freqs.min_freq(), None);
        freqs.debug_validate_invariants();
    }
}
