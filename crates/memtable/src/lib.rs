//! # Memtable - the mutable, in-memory write buffer
//!
//! All writes land here first. The table is an ordered map from key to the
//! latest [`Value`] for that key, so every key appears at most once and a
//! flush can stream the map straight into a run without deduplication.
//!
//! Deletes are writes too: [`Memtable::remove`] stores a tombstone that must
//! survive the flush so older runs stay shadowed until compaction.

mod cell;
pub mod clock;

pub use cell::{Cell, Value};
pub use clock::{Clock, ManualClock, MonotonicClock};

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// Fixed per-entry overhead counted by the size estimate (the timestamp).
pub const ENTRY_OVERHEAD: u64 = 8;

fn entry_size(key: &[u8], value: &Value) -> u64 {
    key.len() as u64 + value.data_len() as u64 + ENTRY_OVERHEAD
}

#[derive(Debug)]
pub struct Memtable {
    map: BTreeMap<Vec<u8>, Value>,
    size: u64,
    clock: Arc<dyn Clock>,
}

impl Memtable {
    /// Creates an empty table stamping writes with a [`MonotonicClock`].
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            map: BTreeMap::new(),
            size: 0,
            clock,
        }
    }

    /// Inserts or overwrites `key` with a freshly stamped data value.
    ///
    /// Both slices are copied; the caller may reuse its buffers.
    pub fn upsert(&mut self, key: &[u8], value: &[u8]) {
        let ts = self.clock.now();
        self.insert(key.to_vec(), Value::data(ts, value.to_vec()));
    }

    /// Records a deletion of `key` as a freshly stamped tombstone.
    pub fn remove(&mut self, key: &[u8]) {
        let ts = self.clock.now();
        self.insert(key.to_vec(), Value::tombstone(ts));
    }

    /// Stores `value` under `key` unless the table already holds a newer
    /// version. Returns `true` if the table changed.
    pub fn insert(&mut self, key: Vec<u8>, value: Value) -> bool {
        let added = entry_size(&key, &value);
        match self.map.get_mut(&key) {
            Some(old) if *old <= value => false,
            Some(old) => {
                self.size = self.size.saturating_sub(entry_size(&key, old)) + added;
                *old = value;
                true
            }
            None => {
                self.size += added;
                self.map.insert(key, value);
                true
            }
        }
    }

    /// Point lookup. A tombstone is returned as a cell, not hidden: it is
    /// this table's opinion that the key is gone.
    pub fn get(&self, key: &[u8]) -> Option<Cell> {
        self.map
            .get(key)
            .map(|v| Cell::new(key.to_vec(), v.clone()))
    }

    /// Cells with `key >= from` in ascending order.
    pub fn scan<'a>(&'a self, from: &[u8]) -> impl Iterator<Item = Cell> + 'a {
        self.map
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded))
            .map(|(k, v)| Cell::new(k.clone(), v.clone()))
    }

    /// Running byte estimate used for the flush threshold.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drops every entry and resets the size estimate.
    pub fn clear(&mut self) {
        self.map.clear();
        self.size = 0;
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}
