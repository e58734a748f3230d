//! Versioned records shared by every layer of the engine.
//!
//! ## Ordering
//!
//! ```text
//! Cell:  key ASC, then Value
//! Value: timestamp DESC, then tombstone before data, then data bytes ASC
//! ```
//!
//! Sorting cells therefore groups every version of a key together with the
//! newest version first. The merge pipeline relies on this to keep only the
//! head of each group.

use std::cmp::Ordering;

/// A payload (or a deletion marker) stamped with a logical timestamp.
///
/// `data == None` is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    pub timestamp: u64,
    pub data: Option<Vec<u8>>,
}

impl Value {
    pub fn data(timestamp: u64, data: Vec<u8>) -> Self {
        Self {
            timestamp,
            data: Some(data),
        }
    }

    pub fn tombstone(timestamp: u64) -> Self {
        Self {
            timestamp,
            data: None,
        }
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.data.is_none()
    }

    /// Payload length, `0` for a tombstone.
    #[must_use]
    pub fn data_len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        // Newer sorts first. `None < Some` puts a tombstone ahead of data
        // written at the same instant.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| self.data.cmp(&other.data))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A key paired with one version of its value.
///
/// The derived ordering compares `key` first and `value` second, which is
/// exactly the cell order described in the module docs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cell {
    pub key: Vec<u8>,
    pub value: Value,
}

impl Cell {
    pub fn new(key: Vec<u8>, value: Value) -> Self {
        Self { key, value }
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.value.is_tombstone()
    }

    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.value.timestamp
    }

    /// Splits a live cell into `(key, data)`; `None` for a tombstone.
    pub fn into_pair(self) -> Option<(Vec<u8>, Vec<u8>)> {
        let Cell { key, value } = self;
        value.data.map(|data| (key, data))
    }
}
