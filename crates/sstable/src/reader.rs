use byteorder::ReadBytesExt;
use memtable::Cell;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::{self, Order};
use crate::error::{Result, SSTableError};
use crate::format::{decode_cell, FOOTER_BYTES, OFFSET_BYTES};

/// A read-only, opened run file.
///
/// [`open`](SSTable::open) validates the footer and loads the offset table
/// into memory. Cells stay on disk and are decoded on demand through a
/// persistent file handle, so a lookup costs one seek per binary-search
/// probe plus one read for the hit.
///
/// Every key appears at most once in a run, so searches compare raw keys
/// only.
#[derive(Debug)]
pub struct SSTable {
    path: PathBuf,
    /// Byte offset of each cell, ascending.
    offsets: Vec<u64>,
    /// Length of the cell region, i.e. where the offset table starts.
    data_len: u64,
    file: Mutex<BufReader<File>>,
}

impl SSTable {
    /// Opens a run file.
    ///
    /// # Errors
    ///
    /// [`SSTableError::Corrupt`] if the file is shorter than the footer, the
    /// declared row count needs more bytes than the file has, or an offset
    /// points outside the cell region or goes backwards.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut f = File::open(&path)?;
        let filesize = f.metadata()?.len();

        if filesize < FOOTER_BYTES {
            return Err(corrupt(&path, format!("{filesize} bytes is too small for a footer")));
        }

        f.seek(SeekFrom::End(-(FOOTER_BYTES as i64)))?;
        let rows = f.read_u64::<Order>()?;

        let data_len = rows
            .checked_mul(OFFSET_BYTES)
            .and_then(|table| table.checked_add(FOOTER_BYTES))
            .and_then(|trailer| filesize.checked_sub(trailer))
            .ok_or_else(|| {
                corrupt(&path, format!("{rows} rows do not fit in {filesize} bytes"))
            })?;

        f.seek(SeekFrom::Start(data_len))?;
        let mut reader = BufReader::new(f);

        let mut table = vec![0u8; (rows * OFFSET_BYTES) as usize];
        reader.read_exact(&mut table)?;

        let mut offsets = Vec::with_capacity(rows as usize);
        for chunk in table.chunks_exact(OFFSET_BYTES as usize) {
            let off = codec::get_u64(chunk);
            if off >= data_len {
                return Err(corrupt(
                    &path,
                    format!("offset {off} outside cell region of {data_len} bytes"),
                ));
            }
            if offsets.last().is_some_and(|&prev| off <= prev) {
                return Err(corrupt(&path, format!("offset {off} is not ascending")));
            }
            offsets.push(off);
        }
        if offsets.first().is_some_and(|&first| first != 0) {
            return Err(corrupt(&path, "cell region does not start at offset 0".into()));
        }

        Ok(Self {
            path,
            offsets,
            data_len,
            file: Mutex::new(reader),
        })
    }

    /// Point lookup. Returns the stored cell, tombstone included, or `None`
    /// if the key is not in this run.
    pub fn get(&self, key: &[u8]) -> Result<Option<Cell>> {
        let mut f = self.file.lock();
        let idx = self.lower_bound(&mut f, key)?;
        if idx >= self.rows() {
            return Ok(None);
        }
        let cell = self.cell_at(&mut f, idx)?;
        Ok((cell.key == key).then_some(cell))
    }

    /// Lazily decodes every cell with `key >= from`, ascending.
    ///
    /// The iterator holds its own handle on the run, so it stays valid while
    /// the engine swaps its run list underneath it.
    pub fn scan(self: &Arc<Self>, from: &[u8]) -> Result<SSTableIter> {
        let start = {
            let mut f = self.file.lock();
            self.lower_bound(&mut f, from)?
        };
        Ok(SSTableIter {
            table: Arc::clone(self),
            next: start,
        })
    }

    /// Number of cells in the run.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First index whose key is `>= key`, or `rows()` if there is none.
    fn lower_bound(&self, f: &mut BufReader<File>, key: &[u8]) -> Result<usize> {
        let (mut lo, mut hi) = (0usize, self.rows());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key_at(f, mid)?.as_slice() < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// End of cell `idx` within the cell region.
    fn cell_end(&self, idx: usize) -> u64 {
        self.offsets.get(idx + 1).copied().unwrap_or(self.data_len)
    }

    fn key_at(&self, f: &mut BufReader<File>, idx: usize) -> Result<Vec<u8>> {
        let start = self.offsets[idx];
        let end = self.cell_end(idx);
        if end - start < 4 {
            return Err(corrupt(&self.path, format!("cell {idx} too short for a key length")));
        }

        f.seek(SeekFrom::Start(start))?;
        let key_len = f.read_i32::<Order>()?;
        let key_len = u64::try_from(key_len)
            .ok()
            .filter(|&len| len <= end - start - 4)
            .ok_or_else(|| {
                corrupt(&self.path, format!("cell {idx} has bad key length {key_len}"))
            })?;

        let mut key = vec![0u8; key_len as usize];
        f.read_exact(&mut key)?;
        Ok(key)
    }

    fn cell_at(&self, f: &mut BufReader<File>, idx: usize) -> Result<Cell> {
        let start = self.offsets[idx];
        let end = self.cell_end(idx);

        f.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; (end - start) as usize];
        f.read_exact(&mut buf)?;

        decode_cell(&buf).map_err(|reason| corrupt(&self.path, format!("cell {idx}: {reason}")))
    }
}

/// Forward scan over a run. Fuses after the first error.
#[derive(Debug)]
pub struct SSTableIter {
    table: Arc<SSTable>,
    next: usize,
}

impl Iterator for SSTableIter {
    type Item = Result<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.table.rows() {
            return None;
        }
        let idx = self.next;
        let res = {
            let mut f = self.table.file.lock();
            self.table.cell_at(&mut f, idx)
        };
        self.next = if res.is_ok() { idx + 1 } else { self.table.rows() };
        Some(res)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.table.rows().saturating_sub(self.next);
        (left, Some(left))
    }
}

fn corrupt(path: &Path, reason: String) -> SSTableError {
    SSTableError::Corrupt {
        path: path.to_path_buf(),
        reason,
    }
}
