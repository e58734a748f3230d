/// Read path: `get()`, `scan()` and `range()`.
///
/// Each read snapshots the memtable (a point lookup, or a copy of the
/// scanned tail) and the current run list under the read locks, then does
/// its run I/O lock-free. Results are combined by timestamp, never by which
/// source they came from.
use memtable::{Cell, Value};
use sstable::merge::{collapse_cells, live, until_key, MergeIter};
use std::fmt;
use std::sync::Arc;

use crate::{Engine, Error, Result, Run};

/// A boxed, fallible stream of cells in cell order.
pub(crate) type CellSource = Box<dyn Iterator<Item = sstable::Result<Cell>> + Send>;

/// Live `(key, value)` pairs in ascending key order.
///
/// Holds its own references to the runs it reads, so it stays valid across
/// concurrent flushes and compactions (it then reflects the state at the
/// time it was created). Fuses after the first error.
pub struct Scan {
    inner: CellSource,
    failed: bool,
}

impl Scan {
    fn new(inner: impl Iterator<Item = sstable::Result<Cell>> + Send + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            failed: false,
        }
    }
}

impl fmt::Debug for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan").field("failed", &self.failed).finish()
    }
}

impl Iterator for Scan {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.inner.next()? {
                Ok(cell) => {
                    if let Some(pair) = cell.into_pair() {
                        return Some(Ok(pair));
                    }
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

impl Engine {
    /// Looks up `key`.
    ///
    /// Every source is probed and the version with the newest timestamp
    /// wins. Runs are few once compaction has bounded them, so they are
    /// probed one after another.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no source has the key or its newest version is
    /// a tombstone; [`Error::CorruptRun`] / [`Error::Io`] if a run cannot be
    /// read.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let (mut best, runs) = {
            let mem = self.mem.read();
            (mem.get(key), self.runs_snapshot())
        };

        for run in runs.iter() {
            if let Some(cell) = run.table.get(key)? {
                if best.as_ref().map_or(true, |b| cell < *b) {
                    best = Some(cell);
                }
            }
        }

        match best {
            Some(Cell {
                value: Value {
                    data: Some(data), ..
                },
                ..
            }) => Ok(data),
            _ => Err(Error::NotFound),
        }
    }

    /// Live pairs with `key >= from`, ascending.
    pub fn scan(&self, from: &[u8]) -> Result<Scan> {
        Ok(Scan::new(self.live_cells(from)?))
    }

    /// Live pairs with `from <= key < to`, ascending.
    pub fn range(&self, from: &[u8], to: &[u8]) -> Result<Scan> {
        Ok(Scan::new(until_key(self.live_cells(from)?, to.to_vec())))
    }

    /// merge → newest per key → drop tombstones, over the memtable and
    /// every run, starting at `from`.
    fn live_cells(
        &self,
        from: &[u8],
    ) -> Result<impl Iterator<Item = sstable::Result<Cell>> + Send + 'static> {
        let (mem_cells, runs) = {
            let mem = self.mem.read();
            (mem.scan(from).collect::<Vec<Cell>>(), self.runs_snapshot())
        };

        let mut sources: Vec<CellSource> = Vec::with_capacity(runs.len() + 1);
        sources.push(Box::new(
            mem_cells.into_iter().map(Ok::<Cell, sstable::SSTableError>),
        ));
        for run in runs.iter() {
            sources.push(Box::new(run.table.scan(from)?));
        }

        Ok(live(collapse_cells(MergeIter::new(sources))))
    }

    /// Current run list. Callers holding the memtable read lock get a
    /// consistent pair: flush swaps both under their write locks.
    pub(crate) fn runs_snapshot(&self) -> Arc<Vec<Run>> {
        Arc::clone(&self.runs.read())
    }
}
