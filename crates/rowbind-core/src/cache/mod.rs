//! Bounded concurrent cache with frequency-with-aging eviction.
//!
//! Each entry carries a usage stamp counting reads since it was last aged.
//! The cache's age advances every `capacity / 2` successful writes, and a
//! stale count is halved once per elapsed age before it is used, so entries
//! that were hot long ago become evictable again.
//!
//! Misses follow compute-then-publish: concurrent misses for one key may all
//! run the factory, but only the first published value is retained and
//! every caller receives that value.

mod stamp;


use dashmap::{DashMap, mapref::entry::Entry};
use rand::Rng;
use stamp::UsageStamp;
use std::{
    hash::Hash,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU32, AtomicUsize, Ordering},
    },
};

///
/// CONSTANTS
///

/// Writes between two age increments, as a fraction of capacity.
pub const WRITES_PER_AGE_FRACTION: usize = 2;

/// Upper bound on entries sampled when choosing a victim.
pub const MAX_EXAMINED_ON_EVICT: usize = 30;

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub size: usize,
    pub capacity: usize,
}

///
/// CacheEntry
///

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    stamp: UsageStamp,
}

///
/// WriterState
///
/// Mutated only behind the writer lock. `ring` is the eviction snapshot,
/// built once when the cache first fills; each eviction overwrites the
/// victim's slot with the newly added entry.
///

struct WriterState<K, V> {
    space_remaining: usize,
    writes_remaining: usize,
    ring: Option<Vec<(K, Arc<CacheEntry<V>>)>>,
}

///
/// BoundedCache
///

pub struct BoundedCache<K, V> {
    entries: DashMap<K, Arc<CacheEntry<V>>>,
    capacity: usize,
    writes_per_age: usize,
    current_age: AtomicU32,
    writer: Mutex<WriterState<K, V>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K, V> BoundedCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let writes_per_age = (capacity / WRITES_PER_AGE_FRACTION).max(1);

        Self {
            entries: DashMap::with_capacity(capacity),
            capacity,
            writes_per_age,
            current_age: AtomicU32::new(0),
            writer: Mutex::new(WriterState {
                space_remaining: capacity,
                writes_remaining: writes_per_age,
                ring: None,
            }),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Look up `key`, counting one use on a hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key).map(|entry| Arc::clone(entry.value()));

        if let Some(entry) = entry {
            entry.stamp.touch(self.current_age.load(Ordering::Acquire));
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(entry.value.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Return the cached value or compute and publish one.
    pub fn get_or_add(&self, key: K, factory: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }

        self.publish(key, factory())
    }

    /// Like `get_or_add`, but a failed computation is returned and not cached.
    pub fn get_or_try_add<E>(
        &self,
        key: K,
        factory: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        Ok(self.publish(key, factory()?))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.len(),
            capacity: self.capacity,
        }
    }

    /// Drop every entry and reset the aging state.
    pub fn clear(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.entries.clear();
        writer.space_remaining = self.capacity;
        writer.writes_remaining = self.writes_per_age;
        writer.ring = None;
    }

    #[cfg(test)]
    pub(crate) fn current_age(&self) -> u32 {
        self.current_age.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn use_count(&self, key: &K) -> Option<u32> {
        let entry = self.entries.get(key).map(|entry| Arc::clone(entry.value()))?;

        Some(entry.stamp.use_count(self.current_age.load(Ordering::Acquire)))
    }

    fn publish(&self, key: K, value: V) -> V {
        let entry = Arc::new(CacheEntry {
            value,
            stamp: UsageStamp::new(),
        });
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        // snapshot before inserting so the ring holds exactly `capacity` entries
        if writer.space_remaining == 0 && writer.ring.is_none() {
            writer.ring = Some(
                self.entries
                    .iter()
                    .map(|item| (item.key().clone(), Arc::clone(item.value())))
                    .collect(),
            );
        }

        match self.entries.entry(key.clone()) {
            // lost the race; the published value wins
            Entry::Occupied(existing) => return existing.get().value.clone(),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&entry));
            }
        }

        let age = self.advance_age(&mut writer);
        entry.stamp.store(age, 1);

        if writer.space_remaining > 0 {
            writer.space_remaining -= 1;
        } else if let Some(ring) = writer.ring.as_mut() {
            self.evict(ring, age, key, Arc::clone(&entry));
        }

        entry.value.clone()
    }

    fn advance_age(&self, writer: &mut WriterState<K, V>) -> u32 {
        writer.writes_remaining -= 1;
        if writer.writes_remaining == 0 {
            writer.writes_remaining = self.writes_per_age;
            return self
                .current_age
                .fetch_add(1, Ordering::AcqRel)
                .wrapping_add(1);
        }

        self.current_age.load(Ordering::Acquire)
    }

    fn evict(
        &self,
        ring: &mut [(K, Arc<CacheEntry<V>>)],
        age: u32,
        key: K,
        entry: Arc<CacheEntry<V>>,
    ) {
        let len = ring.len();
        let mut rng = rand::thread_rng();
        let mut victim = rng.gen_range(0..len);
        let mut min_count = ring[victim].1.stamp.use_count(age);
        let start = victim;

        let mut examine = |index: usize| {
            let count = ring[index].1.stamp.use_count(age);
            if count < min_count {
                min_count = count;
                victim = index;
            }
        };

        if len <= MAX_EXAMINED_ON_EVICT {
            for offset in 1..len {
                examine((start + offset) % len);
            }
        } else {
            for _ in 1..MAX_EXAMINED_ON_EVICT {
                examine(rng.gen_range(0..len));
            }
        }

        self.entries.remove(&ring[victim].0);
        tracing::trace!(slot = victim, use_count = min_count, age, "evicted cache entry");
        ring[victim] = (key, entry);
    }
}
