//! Run file layout, cell encoding and file naming.
//!
//! ```text
//! [cell region]   variable length
//! [offset table]  rows x u64, one per cell, ascending key order
//! [row count]     u64
//! ```
//!
//! Each cell, at the offset recorded for it:
//!
//! ```text
//! key_len   i32
//! key       key_len bytes
//! timestamp i64    >= 0 live, < 0 tombstone (magnitude is the timestamp)
//! value_len i32    live cells only
//! value     value_len bytes, live cells only
//! ```

use memtable::{Cell, Value};

use crate::codec;
use crate::error::{Result, SSTableError};

/// Size of the trailing row count.
pub const FOOTER_BYTES: u64 = 8;
/// Size of one offset table entry.
pub const OFFSET_BYTES: u64 = 8;

pub const BASE_NAME: &str = "SSTable";
/// Suffix of a published run file.
pub const SUFFIX: &str = ".dat";
/// Suffix of a run file still being written.
pub const TEMP_SUFFIX: &str = ".tmp";

/// `3` -> `3SSTable.dat`
pub fn run_file_name(generation: u64) -> String {
    format!("{generation}{BASE_NAME}{SUFFIX}")
}

/// `3` -> `3SSTable.tmp`
pub fn temp_file_name(generation: u64) -> String {
    format!("{generation}{BASE_NAME}{TEMP_SUFFIX}")
}

pub fn is_run_file(name: &str) -> bool {
    name.ends_with(SUFFIX)
}

pub fn is_temp_file(name: &str) -> bool {
    name.ends_with(TEMP_SUFFIX)
}

/// Generation embedded in a file name: its leading decimal digits.
///
/// No leading digit means generation 0. A number too large for `u64`
/// saturates to `u64::MAX`.
pub fn parse_generation(name: &str) -> u64 {
    let end = name
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(name.len());
    let digits = &name[..end];
    if digits.is_empty() {
        return 0;
    }
    // only overflow can fail here
    digits.parse().unwrap_or(u64::MAX)
}

/// Appends the encoding of `cell` to `out`.
pub fn encode_cell(cell: &Cell, out: &mut Vec<u8>) -> Result<()> {
    let key_len = i32::try_from(cell.key.len())
        .map_err(|_| SSTableError::InvalidInput(format!("key of {} bytes", cell.key.len())))?;
    let ts = i64::try_from(cell.value.timestamp).map_err(|_| {
        SSTableError::InvalidInput(format!("timestamp {} exceeds i64", cell.value.timestamp))
    })?;

    codec::put_i32(out, key_len);
    out.extend_from_slice(&cell.key);
    match &cell.value.data {
        Some(data) => {
            let val_len = i32::try_from(data.len())
                .map_err(|_| SSTableError::InvalidInput(format!("value of {} bytes", data.len())))?;
            codec::put_i64(out, ts);
            codec::put_i32(out, val_len);
            out.extend_from_slice(data);
        }
        None => {
            if ts == 0 {
                return Err(SSTableError::InvalidInput(
                    "tombstone at timestamp 0 cannot be encoded".into(),
                ));
            }
            codec::put_i64(out, -ts);
        }
    }
    Ok(())
}

/// Decodes one cell that must occupy all of `buf`.
///
/// Returns a description of the defect for a malformed record; the caller
/// attaches the file path.
pub fn decode_cell(buf: &[u8]) -> std::result::Result<Cell, String> {
    let mut pos = 0usize;

    let key_len = read_len(buf, &mut pos, "key")?;
    let key = take(buf, &mut pos, key_len, "key")?.to_vec();

    let ts = codec::get_i64(take(buf, &mut pos, 8, "timestamp")?);

    let value = if ts < 0 {
        Value::tombstone(ts.unsigned_abs())
    } else {
        let val_len = read_len(buf, &mut pos, "value")?;
        let data = take(buf, &mut pos, val_len, "value")?.to_vec();
        Value::data(ts as u64, data)
    };

    if pos != buf.len() {
        return Err(format!("{} trailing bytes after cell", buf.len() - pos));
    }
    Ok(Cell::new(key, value))
}

fn read_len(buf: &[u8], pos: &mut usize, what: &str) -> std::result::Result<usize, String> {
    let raw = take(buf, pos, 4, what)?;
    let len = codec::get_i32(raw);
    usize::try_from(len).map_err(|_| format!("negative {what} length {len}"))
}

fn take<'a>(
    buf: &'a [u8],
    pos: &mut usize,
    n: usize,
    what: &str,
) -> std::result::Result<&'a [u8], String> {
    let end = pos
        .checked_add(n)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| format!("{what} runs past the end of the cell ({n} bytes at {pos})"))?;
    let slice = &buf[*pos..end];
    *pos = end;
    Ok(slice)
}
