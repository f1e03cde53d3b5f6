//! Ring buffer of records
//!
//! Every record gets an absolute index when inserted. Its slot is
//! `index % capacity`, so lookups are O(1) and a slot only ever holds
//! the newest record that mapped to it. The live window is
//! `[next_index - capacity, next_index)`.
//!
//! A single consumer inserts while any number of views read; the
//! writer takes the lock exclusively per insert, readers share it per
//! query.

use bytes::Bytes;
use parking_lot::RwLock;
use std::ops::Range;
use std::sync::Arc;

use crate::record::Record;

/// Default capacity for the store
pub const DEFAULT_CAPACITY: usize = 100_000;

/// Fixed-capacity store of the most recent records
#[derive(Debug)]
pub struct LogStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    /// Slot `i` holds the latest record with `index % capacity == i`
    slots: Vec<Option<Record>>,
    /// Index the next insert will receive
    next_index: u64,
    capacity: usize,
}

impl StoreInner {
    fn oldest_index(&self) -> u64 {
        self.next_index.saturating_sub(self.capacity as u64)
    }

    fn slot(&self, index: u64) -> usize {
        (index % self.capacity as u64) as usize
    }

    fn get(&self, index: u64) -> Option<&Record> {
        if index >= self.next_index || index < self.oldest_index() {
            return None;
        }
        self.slots[self.slot(index)]
            .as_ref()
            .filter(|record| record.index() == index)
    }

    fn range(&self, start: u64, end: u64) -> Vec<Record> {
        if start >= end || end - start > self.capacity as u64 {
            return Vec::new();
        }

        let start = start.max(self.oldest_index());
        let end = end.min(self.next_index);

        (start..end)
            .filter_map(|index| self.get(index).cloned())
            .collect()
    }
}

impl LogStore {
    /// Create a store with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store holding at most `capacity` records (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(StoreInner {
                slots: vec![None; capacity],
                next_index: 0,
                capacity,
            }),
        }
    }

    /// Append a record, overwriting the oldest one when full
    ///
    /// Returns the absolute index assigned to the record.
    pub fn insert(&self, label: impl Into<Arc<str>>, payload: impl Into<Bytes>) -> u64 {
        let label = label.into();
        let payload = payload.into();

        let mut inner = self.inner.write();
        let index = inner.next_index;
        let slot = inner.slot(index);
        inner.slots[slot] = Some(Record::new(index, label, payload));
        inner.next_index += 1;
        index
    }

    /// Look up one record by absolute index
    ///
    /// `None` when the index was never written or has been overwritten.
    pub fn at(&self, index: u64) -> Option<Record> {
        self.inner.read().get(index).cloned()
    }

    /// Records in `[start, end)` in insertion order
    ///
    /// Empty when `start >= end` or the range is wider than the capacity.
    /// Indices outside the live window are skipped.
    pub fn window(&self, start: u64, end: u64) -> Vec<Record> {
        self.inner.read().range(start, end)
    }

    /// The newest `n` records, oldest first
    pub fn tail(&self, n: usize) -> Vec<Record> {
        let inner = self.inner.read();
        let written = inner.next_index.min(inner.capacity as u64);
        let n = (n as u64).min(written);
        inner.range(inner.next_index - n, inner.next_index)
    }

    /// Index the next insert will receive
    pub fn next_index(&self) -> u64 {
        self.inner.read().next_index
    }

    /// Range of indices currently held
    pub fn live_range(&self) -> Range<u64> {
        let inner = self.inner.read();
        inner.oldest_index()..inner.next_index
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        let inner = self.inner.read();
        inner.next_index.min(inner.capacity as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.read().capacity
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}
