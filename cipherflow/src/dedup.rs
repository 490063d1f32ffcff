//! Bounded insertion-ordered dedup ledgers.
//!
//! A long-lived orchestrator cannot remember every result it has ever
//! handled, so processed-item tracking is a bounded membership set: O(1)
//! membership test and insert, insertion order retained, and batch eviction
//! of the oldest half when the capacity is reached. Evicting a batch rather
//! than one entry per insert amortizes cleanup across many inserts.
//!
//! Two independent instances run per orchestrator: one keyed by correlation
//! id (poll path) and one keyed by delivery signature (event path).

use std::hash::Hash;
use std::sync::Mutex;

use indexmap::IndexSet;
use tracing::debug;

/// Default maximum number of retained entries.
pub const DEFAULT_CAPACITY: usize = 1_000;

/// Default number of oldest entries dropped per eviction.
pub const DEFAULT_EVICT_BATCH: usize = 500;

/// Thread-safe bounded membership set with insertion-order eviction.
pub struct ProcessedSet<T> {
    entries: Mutex<IndexSet<T>>,
    capacity: usize,
    evict_batch: usize,
}

impl<T: Hash + Eq> ProcessedSet<T> {
    /// Creates a set with the default capacity and eviction batch.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_EVICT_BATCH)
    }

    /// Creates a set with explicit bounds.
    ///
    /// `capacity` and `evict_batch` are clamped to at least 1, and the batch
    /// never exceeds the capacity.
    pub fn with_capacity(capacity: usize, evict_batch: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(IndexSet::with_capacity(capacity)),
            capacity,
            evict_batch: evict_batch.clamp(1, capacity),
        }
    }

    /// Returns true if `key` has been recorded and not yet evicted.
    pub fn contains(&self, key: &T) -> bool {
        self.entries
            .lock()
            .expect("processed set lock poisoned")
            .contains(key)
    }

    /// Records `key`, evicting the oldest batch first if the set is full.
    ///
    /// Returns `false` if the key was already present (no-op).
    pub fn insert(&self, key: T) -> bool {
        let mut entries = self.entries.lock().expect("processed set lock poisoned");
        if entries.contains(&key) {
            return false;
        }
        if entries.len() >= self.capacity {
            let batch = self.evict_batch.min(entries.len());
            entries.drain(..batch);
            debug!(evicted = batch, "processed set at capacity, evicted oldest batch");
        }
        entries.insert(key)
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("processed set lock poisoned")
            .len()
    }

    /// Returns true if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry. Administrative reset only.
    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("processed set lock poisoned")
            .clear();
    }
}

impl<T: Hash + Eq> Default for ProcessedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
