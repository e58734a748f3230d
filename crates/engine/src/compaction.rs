/// Compaction: merges every run into a single run.
///
/// The merge sees all on-disk data, so after collapsing to the newest
/// version per key there is no older layer a tombstone could still need to
/// shadow; tombstones are dropped. The memtable takes no part: its contents
/// are newer than anything on disk.
use sstable::merge::{collapse_cells, live, MergeIter};
use sstable::{SSTable, SSTableWriter};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::read::CellSource;
use crate::{Engine, Error, Result, Run, WriterState};

impl Engine {
    /// Compacts all runs into one. No-op with fewer than two runs.
    ///
    /// Called automatically after a flush once the run count exceeds the
    /// compaction threshold.
    ///
    /// # Errors
    ///
    /// If writing the merged run fails, nothing changes. If the merged run
    /// is published but an old run file cannot be deleted (for a reason
    /// other than already being gone), the run list has already been
    /// swapped and the first deletion error is returned.
    pub fn compact(&self) -> Result<()> {
        let mut w = self.writer.lock();
        self.compact_locked(&mut w)
    }

    /// # Steps
    ///
    /// 1. Snapshot the run list.
    /// 2. Stream merge → newest per key → drop tombstones into a new run at
    ///    the next generation (temp file + rename).
    /// 3. Replace the run list with just the new run.
    /// 4. Delete the old run files, treating "already gone" as success.
    pub(crate) fn compact_locked(&self, w: &mut WriterState) -> Result<()> {
        let inputs = Arc::clone(&self.runs.read());
        if inputs.len() < 2 {
            return Ok(());
        }
        let generation = w.next_generation.ok_or(Error::GenerationExhausted)?;

        let sources = inputs
            .iter()
            .map(|run| Ok(Box::new(run.table.scan(&[])?) as CellSource))
            .collect::<Result<Vec<_>>>()?;
        let cells = live(collapse_cells(MergeIter::new(sources)));

        let (path, rows) = SSTableWriter::publish(
            &self.config.dir,
            generation,
            cells,
            self.config.sync_on_publish,
        )?;
        w.next_generation = generation.checked_add(1);

        let table = Arc::new(SSTable::open(&path)?);
        *self.runs.write() = Arc::new(vec![Run { generation, table }]);

        let old_paths: Vec<PathBuf> = inputs
            .iter()
            .map(|run| run.table.path().to_path_buf())
            .filter(|p| *p != path)
            .collect();
        // Release our handles first; in-flight scans may still hold theirs.
        drop(inputs);

        let mut first_err: Option<io::Error> = None;
        for p in &old_paths {
            match fs::remove_file(p) {
                Ok(()) => debug!(path = %p.display(), "deleted compacted run"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %p.display(), "compacted run already gone")
                }
                Err(e) => {
                    warn!(path = %p.display(), error = %e, "failed to delete compacted run");
                    first_err.get_or_insert(e);
                }
            }
        }

        info!(inputs = old_paths.len(), generation, rows, "compacted runs");

        match first_err {
            Some(e) => Err(Error::Io(e)),
            None => Ok(()),
        }
    }
}
