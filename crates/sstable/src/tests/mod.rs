
use memtable::{Cell, Value};

pub(crate) fn data_cell(key: &[u8], val: &[u8], ts: u64) -> Cell {
    Cell::new(key.to_vec(), Value::data(ts, val.to_vec()))
}

pub(crate) fn tomb_cell(key: &[u8], ts: u64) -> Cell {
    Cell::new(key.to_vec(), Value::tombstone(ts))
}

pub(crate) fn ok_cells(cells: &[Cell]) -> impl Iterator<Item = crate::Result<Cell>> + '_ {
    cells.iter().cloned().map(Ok)
}
