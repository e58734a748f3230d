//! # SSTable - immutable sorted runs
//!
//! Write-once, read-many on-disk runs for the storage engine. A run is
//! produced either by flushing the memtable or by compacting every existing
//! run into one; it is never modified afterwards, only deleted once a
//! compaction has superseded it.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ CELL REGION                                                   │
//! │                                                               │
//! │ key_len (i32) | key | timestamp (i64)                         │
//! │ [value_len (i32) | value]      only when timestamp >= 0       │
//! │                                                               │
//! │ ... one cell per key, ascending ...                           │
//! ├───────────────────────────────────────────────────────────────┤
//! │ OFFSET TABLE                                                  │
//! │                                                               │
//! │ offset (u64) per cell, in key order                           │
//! ├───────────────────────────────────────────────────────────────┤
//! │ ROW COUNT (u64) - always the last 8 bytes                     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. A negative timestamp marks a tombstone
//! whose timestamp is the magnitude.
//!
//! Runs are named `<generation>SSTable.dat`; while being written they are
//! `<generation>SSTable.tmp` and are renamed into place once complete.

pub mod codec;
pub mod format;
pub mod merge;

mod error;
mod reader;
mod writer;

pub use error::{Result, SSTableError};
pub use merge::{collapse_by, collapse_cells, live, until, until_by, until_key, MergeIter};
pub use reader::{SSTable, SSTableIter};
pub use writer::SSTableWriter;

#[cfg(test)]
mod tests;
