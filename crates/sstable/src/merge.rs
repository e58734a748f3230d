//! Lazy sequence combinators for the read path.
//!
//! All three work over fallible streams (`Iterator<Item = Result<T, E>>`):
//! an `Err` from a source is passed through to the consumer, never
//! swallowed.
//!
//! - [`MergeIter`]: k-way ascending merge of individually sorted sources.
//! - [`Collapse`]: keeps the first item of each run of equal keys.
//! - [`Until`]: stops at the first item that reaches a bound.
//!
//! Chained over cell streams they form the engine's pipeline:
//!
//! ```text
//! memtable scan ┐
//! run 0 scan    ├─ MergeIter ─ Collapse (newest per key) ─ live() ─ Until
//! run N scan    ┘
//! ```

use memtable::Cell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// The current head of one source.
struct HeapEntry<T> {
    item: T,
    /// Index into `MergeIter::sources`.
    source: usize,
}

impl<T: Ord> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for HeapEntry<T> {}

impl<T: Ord> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest item pops first.
        // Equal items pop in source order.
        other
            .item
            .cmp(&self.item)
            .then_with(|| other.source.cmp(&self.source))
    }
}

/// Merges individually ascending sources into one ascending stream.
///
/// Each source is pulled one item at a time; at most one item per source is
/// buffered.
pub struct MergeIter<I, T, E>
where
    I: Iterator<Item = Result<T, E>>,
{
    sources: Vec<I>,
    heap: BinaryHeap<HeapEntry<T>>,
    errors: VecDeque<E>,
}

impl<I, T, E> MergeIter<I, T, E>
where
    I: Iterator<Item = Result<T, E>>,
    T: Ord,
{
    pub fn new(sources: Vec<I>) -> Self {
        let mut merge = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            errors: VecDeque::new(),
        };
        for source in 0..merge.sources.len() {
            merge.advance(source);
        }
        merge
    }

    fn advance(&mut self, source: usize) {
        match self.sources[source].next() {
            Some(Ok(item)) => self.heap.push(HeapEntry { item, source }),
            Some(Err(e)) => self.errors.push_back(e),
            None => {}
        }
    }
}

impl<I, T, E> Iterator for MergeIter<I, T, E>
where
    I: Iterator<Item = Result<T, E>>,
    T: Ord,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.errors.pop_front() {
            return Some(Err(e));
        }
        let HeapEntry { item, source } = self.heap.pop()?;
        self.advance(source);
        Some(Ok(item))
    }
}

/// Emits only the first item of each group of consecutive items that
/// `same_group` considers equal.
///
/// Over a stream in cell order this keeps the newest version of every key.
pub struct Collapse<I, T, E, F>
where
    I: Iterator<Item = Result<T, E>>,
{
    iter: I,
    same_group: F,
    /// Head of the next group, already pulled from `iter`.
    pending: Option<T>,
    /// Error hit while skipping the tail of the previous group.
    error: Option<E>,
}

impl<I, T, E, F> Iterator for Collapse<I, T, E, F>
where
    I: Iterator<Item = Result<T, E>>,
    F: FnMut(&T, &T) -> bool,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.error.take() {
            return Some(Err(e));
        }

        let head = match self.pending.take() {
            Some(head) => head,
            None => match self.iter.next()? {
                Ok(head) => head,
                Err(e) => return Some(Err(e)),
            },
        };

        for item in self.iter.by_ref() {
            match item {
                Ok(item) if (self.same_group)(&head, &item) => continue,
                Ok(item) => {
                    self.pending = Some(item);
                    break;
                }
                Err(e) => {
                    self.error = Some(e);
                    break;
                }
            }
        }

        Some(Ok(head))
    }
}

/// Collapses consecutive items for which `same_group` holds.
pub fn collapse_by<I, T, E, F>(iter: I, same_group: F) -> Collapse<I, T, E, F>
where
    I: Iterator<Item = Result<T, E>>,
    F: FnMut(&T, &T) -> bool,
{
    Collapse {
        iter,
        same_group,
        pending: None,
        error: None,
    }
}

/// Keeps the newest version of each key from a stream in cell order.
pub fn collapse_cells<I, E>(iter: I) -> Collapse<I, Cell, E, fn(&Cell, &Cell) -> bool>
where
    I: Iterator<Item = Result<Cell, E>>,
{
    fn same_key(a: &Cell, b: &Cell) -> bool {
        a.key == b.key
    }
    collapse_by(iter, same_key as fn(&Cell, &Cell) -> bool)
}

/// Drops tombstones, passing errors through.
pub fn live<I, E>(iter: I) -> impl Iterator<Item = Result<Cell, E>>
where
    I: Iterator<Item = Result<Cell, E>>,
{
    iter.filter(|res| !matches!(res, Ok(cell) if cell.is_tombstone()))
}

/// Yields items while `below` holds, then stops for good.
pub struct Until<I, F> {
    iter: I,
    below: F,
    done: bool,
}

impl<I, T, E, F> Iterator for Until<I, F>
where
    I: Iterator<Item = Result<T, E>>,
    F: FnMut(&T) -> bool,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.iter.next() {
            Some(Ok(item)) if (self.below)(&item) => Some(Ok(item)),
            Some(Err(e)) => Some(Err(e)),
            Some(Ok(_)) | None => {
                self.done = true;
                None
            }
        }
    }
}

/// Truncates `iter` at the first item for which `below` is false.
pub fn until_by<I, T, E, F>(iter: I, below: F) -> Until<I, F>
where
    I: Iterator<Item = Result<T, E>>,
    F: FnMut(&T) -> bool,
{
    Until {
        iter,
        below,
        done: false,
    }
}

/// Truncates an ascending stream at the first item `>= bound`.
pub fn until<I, T, E>(iter: I, bound: T) -> Until<I, impl FnMut(&T) -> bool>
where
    I: Iterator<Item = Result<T, E>>,
    T: Ord,
{
    until_by(iter, move |item: &T| *item < bound)
}

/// Truncates a cell stream at the first key `>= bound`.
pub fn until_key<I, E>(iter: I, bound: Vec<u8>) -> Until<I, impl FnMut(&Cell) -> bool>
where
    I: Iterator<Item = Result<Cell, E>>,
{
    until_by(iter, move |cell: &Cell| cell.key < bound)
}
