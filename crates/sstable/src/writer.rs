use memtable::Cell;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::codec;
use crate::error::{Result, SSTableError};
use crate::format::{encode_cell, run_file_name, temp_file_name};

/// Serializes an ascending, key-unique cell stream into a run file.
///
/// The writer is stateless. It is a single sequential pass: cells are
/// encoded as they arrive, their offsets collected, and the offset table
/// plus row count appended at the end. Nothing is ever rewritten.
pub struct SSTableWriter {}

impl SSTableWriter {
    /// Writes `cells` to a new file at `path`, which must not exist yet.
    ///
    /// Returns the number of rows written. The file is not renamed; use
    /// [`publish`](SSTableWriter::publish) for crash-safe publication.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, on the first `Err` yielded by `cells`, if keys are
    /// not strictly ascending, or if a cell cannot be encoded.
    pub fn write<I>(path: &Path, cells: I, sync: bool) -> Result<u64>
    where
        I: IntoIterator<Item = Result<Cell>>,
    {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        Self::write_internal(file, cells, sync)
    }

    /// Writes `cells` as generation `generation` inside `dir` and publishes
    /// it atomically.
    ///
    /// The data goes to `<gen>SSTable.tmp` first and is renamed to
    /// `<gen>SSTable.dat` only once fully written (and fsynced when `sync`
    /// is set). On failure the temp file is removed and nothing appears under
    /// the final name. Returns the published path and its row count.
    pub fn publish<I>(dir: &Path, generation: u64, cells: I, sync: bool) -> Result<(PathBuf, u64)>
    where
        I: IntoIterator<Item = Result<Cell>>,
    {
        let tmp_path = dir.join(temp_file_name(generation));
        let final_path = dir.join(run_file_name(generation));

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let rows = match Self::write_internal(file, cells, sync) {
            Ok(rows) => rows,
            Err(e) => {
                discard_temp(&tmp_path);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            discard_temp(&tmp_path);
            return Err(e.into());
        }

        // Make the rename itself durable. Best effort: not every platform
        // lets a directory be opened for syncing.
        if sync {
            if let Ok(d) = File::open(dir) {
                let _ = d.sync_all();
            }
        }

        debug!(path = %final_path.display(), rows, "published run");
        Ok((final_path, rows))
    }

    fn write_internal<I>(file: File, cells: I, sync: bool) -> Result<u64>
    where
        I: IntoIterator<Item = Result<Cell>>,
    {
        let mut out = BufWriter::new(file);
        let mut offsets: Vec<u64> = Vec::new();
        let mut offset = 0u64;
        let mut record: Vec<u8> = Vec::with_capacity(256);
        let mut prev_key: Option<Vec<u8>> = None;

        for cell in cells {
            let cell = cell?;
            if let Some(prev) = &prev_key {
                if cell.key <= *prev {
                    return Err(SSTableError::InvalidInput(
                        "cells must be strictly ascending by key".into(),
                    ));
                }
            }

            record.clear();
            encode_cell(&cell, &mut record)?;
            offsets.push(offset);
            out.write_all(&record)?;
            offset += record.len() as u64;

            prev_key = Some(cell.key);
        }

        // offset table + row count
        record.clear();
        for off in &offsets {
            codec::put_u64(&mut record, *off);
        }
        codec::put_u64(&mut record, offsets.len() as u64);
        out.write_all(&record)?;

        out.flush()?;
        let file = out.into_inner().map_err(|e| e.into_error())?;
        if sync {
            file.sync_all()?;
        }

        Ok(offsets.len() as u64)
    }
}

fn discard_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove temp run file");
    }
}
