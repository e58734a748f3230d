/// Write path: `upsert()`, `remove()`, `flush()`.
///
/// Every mutation goes to the memtable under the writer lock, followed by
/// the flush-threshold check. A flush publishes the memtable as a new run,
/// swaps it into the run list and clears the memtable in one step as seen
/// by readers, then checks the compaction threshold.
use sstable::{SSTable, SSTableWriter};
use std::sync::Arc;
use tracing::info;

use crate::{Engine, Error, Result, Run, WriterState, MAX_LEN};

impl Engine {
    /// Inserts or overwrites `key`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for a key or value longer than [`MAX_LEN`].
    /// A flush triggered by this write may fail with an I/O error; the write
    /// itself is kept in the memtable either way.
    pub fn upsert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        check_len("key", key)?;
        check_len("value", value)?;

        let mut w = self.writer.lock();
        self.mem.write().upsert(key, value);
        self.maybe_flush(&mut w)
    }

    /// Deletes `key` by writing a tombstone.
    ///
    /// The tombstone shadows older versions in every run until a
    /// compaction retires both.
    pub fn remove(&self, key: &[u8]) -> Result<()> {
        check_len("key", key)?;

        let mut w = self.writer.lock();
        self.mem.write().remove(key);
        self.maybe_flush(&mut w)
    }

    /// Flushes the memtable to a new run. No-op if the memtable is empty.
    ///
    /// # Errors
    ///
    /// On failure the memtable and run list are left untouched, so the
    /// flush can simply be retried.
    pub fn flush(&self) -> Result<()> {
        let mut w = self.writer.lock();
        self.flush_locked(&mut w)
    }

    fn maybe_flush(&self, w: &mut WriterState) -> Result<()> {
        if self.mem.read().size_in_bytes() > self.config.flush_threshold {
            self.flush_locked(w)?;
        }
        Ok(())
    }

    /// # Steps
    ///
    /// 1. Take the next generation number.
    /// 2. Publish the memtable, tombstones included, as that generation
    ///    (temp file + rename).
    /// 3. Open the new run.
    /// 4. Under both locks: append it to a fresh run list, clear the
    ///    memtable.
    /// 5. Compact if the run count exceeds the threshold.
    pub(crate) fn flush_locked(&self, w: &mut WriterState) -> Result<()> {
        let generation = w.next_generation.ok_or(Error::GenerationExhausted)?;

        let (path, rows) = {
            let mem = self.mem.read();
            if mem.is_empty() {
                return Ok(());
            }
            SSTableWriter::publish(
                &self.config.dir,
                generation,
                mem.scan(&[]).map(Ok),
                self.config.sync_on_publish,
            )?
        };
        // the name is taken even if opening fails below
        w.next_generation = generation.checked_add(1);

        let table = Arc::new(SSTable::open(&path)?);

        let run_count = {
            let mut mem = self.mem.write();
            let mut runs = self.runs.write();
            let mut next: Vec<Run> = (**runs).clone();
            next.push(Run { generation, table });
            *runs = Arc::new(next);
            mem.clear();
            runs.len()
        };

        info!(generation, rows, runs = run_count, "flushed memtable");

        if run_count > self.config.compaction_threshold {
            self.compact_locked(w)?;
        }
        Ok(())
    }
}

fn check_len(what: &str, bytes: &[u8]) -> Result<()> {
    if bytes.len() > MAX_LEN {
        return Err(Error::InvalidInput(format!(
            "{what} too large: {} bytes (max {MAX_LEN})",
            bytes.len()
        )));
    }
    Ok(())
}
