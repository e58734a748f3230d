//! # Engine - LSM key-value storage engine
//!
//! The orchestrator tying the [`memtable`] and [`sstable`] crates into a
//! complete store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → Memtable upsert / remove           │
//! │              |                                │
//! │              |  (size > flush_threshold?)     │
//! │              |            yes                 │
//! │              v                                │
//! │           flush() → new run (gen N)           │
//! │              |                                │
//! │              |  (runs > compaction limit?)    │
//! │              |            yes                 │
//! │              v                                │
//! │           compact() → single run (gen N+1)    │
//! │                                               │
//! │ read.rs → merge(Memtable, runs...)            │
//! │            → newest per key → drop tombstones │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                              |
//! |----------------|------------------------------------------------------|
//! | [`lib.rs`]     | `Engine` struct, open, close, accessors, `Drop`      |
//! | [`recovery`]   | run discovery, generation recovery, temp cleanup     |
//! | [`write`]      | `upsert()`, `remove()`, `flush()`                    |
//! | [`read`]       | `get()`, `scan()`, `range()`                         |
//! | [`compaction`] | `compact()`: merge every run into one, drop tombstones |
//!
//! ## Concurrency
//!
//! All operations take `&self`. Writers, flush and compaction serialize on
//! one mutex. Readers take the memtable read lock and clone the current run
//! list (an `Arc<Vec<_>>` that is replaced, never edited) and then do their
//! I/O without holding any engine lock. A scan started before a compaction
//! keeps reading the runs it captured.
//!
//! ## Crash Safety
//!
//! Runs are published by writing `<gen>SSTable.tmp` and renaming it to
//! `<gen>SSTable.dat`. In-memory state changes only after the filesystem
//! step succeeded, so a failed flush or compaction leaves the engine as it
//! was. Writes still in the memtable are lost on a crash; `close()` or drop
//! flushes them.

mod compaction;
mod error;
mod read;
mod recovery;
mod write;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use memtable::{Clock, ManualClock, MonotonicClock};
pub use read::Scan;

use memtable::Memtable;
use parking_lot::{Mutex, RwLock};
use sstable::SSTable;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Longest key or value the run format can encode.
pub const MAX_LEN: usize = i32::MAX as usize;

/// One published run and the generation parsed from its name.
#[derive(Debug, Clone)]
pub(crate) struct Run {
    pub(crate) generation: u64,
    pub(crate) table: Arc<SSTable>,
}

/// State owned by whoever holds the writer lock.
#[derive(Debug)]
pub(crate) struct WriterState {
    /// `None` once generation `u64::MAX` has been used.
    pub(crate) next_generation: Option<u64>,
}

/// The storage engine: one memtable plus the ordered list of runs.
///
/// # Write Path
///
/// 1. Stamp the mutation with the engine's clock and apply it to the
///    memtable.
/// 2. If the memtable's size estimate exceeds `flush_threshold`, write it
///    to a new run and clear it.
/// 3. If the run count now exceeds `compaction_threshold`, merge every run
///    into one.
///
/// # Read Path
///
/// The memtable and every run are merged in cell order, only the newest
/// version of each key survives, and tombstones are dropped.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) mem: RwLock<Memtable>,
    /// Published runs ordered by generation. Replaced wholesale.
    pub(crate) runs: RwLock<Arc<Vec<Run>>>,
    pub(crate) writer: Mutex<WriterState>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mem = self.mem.read();
        f.debug_struct("Engine")
            .field("dir", &self.config.dir)
            .field("flush_threshold", &self.config.flush_threshold)
            .field("compaction_threshold", &self.config.compaction_threshold)
            .field("memtable_size", &mem.size_in_bytes())
            .field("memtable_entries", &mem.len())
            .field("run_count", &self.runs.read().len())
            // try_lock: formatting must not wait on (or deadlock with) a writer
            .field(
                "next_generation",
                &self.writer.try_lock().map(|w| w.next_generation),
            )
            .finish()
    }
}

impl Engine {
    /// Opens the engine over `dir` with default settings and a wall-clock
    /// based [`MonotonicClock`].
    pub fn open<P: AsRef<Path>>(dir: P, flush_threshold: u64) -> Result<Self> {
        Self::open_with(
            EngineConfig::new(dir.as_ref(), flush_threshold),
            Arc::new(MonotonicClock::new()),
        )
    }

    /// Opens the engine with an explicit configuration and clock.
    ///
    /// # Recovery Steps
    ///
    /// 1. Validate the configuration.
    /// 2. Delete leftover `*.tmp` files from interrupted publishes.
    /// 3. Open every `*.dat` run, ordered by the generation in its name.
    /// 4. Continue numbering at the highest generation + 1.
    /// 5. Move the clock past the newest timestamp on disk.
    ///
    /// # Errors
    ///
    /// [`Error::Init`] if a run fails to open or read, [`Error::Io`] if the
    /// directory cannot be listed (it must already exist).
    pub fn open_with(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        recovery::cleanup_temp_files(&config.dir);
        let runs = recovery::load_runs(&config.dir)?;
        let next_generation = recovery::next_generation(&runs);
        let max_timestamp = recovery::max_timestamp(&runs)?;
        clock.observe(max_timestamp);

        info!(
            dir = %config.dir.display(),
            runs = runs.len(),
            next_generation = ?next_generation,
            max_timestamp,
            "opened engine"
        );

        Ok(Self {
            config,
            mem: RwLock::new(Memtable::with_clock(clock)),
            runs: RwLock::new(Arc::new(runs)),
            writer: Mutex::new(WriterState { next_generation }),
        })
    }

    /// Flushes buffered writes and releases every run handle.
    pub fn close(self) -> Result<()> {
        self.flush()
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of published runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.read().len()
    }

    /// Generations of the published runs, ascending.
    #[must_use]
    pub fn run_generations(&self) -> Vec<u64> {
        self.runs.read().iter().map(|r| r.generation).collect()
    }

    /// The memtable's current size estimate.
    #[must_use]
    pub fn memtable_size(&self) -> u64 {
        self.mem.read().size_in_bytes()
    }

    /// Number of entries (tombstones included) in the memtable.
    #[must_use]
    pub fn memtable_len(&self) -> usize {
        self.mem.read().len()
    }

    /// Generation the next published run will get.
    #[must_use]
    pub fn next_generation(&self) -> Option<u64> {
        self.writer.lock().next_generation
    }
}

/// Best-effort flush on drop.
///
/// Errors are ignored because `Drop` cannot report them; call
/// [`Engine::close`] to observe them.
impl Drop for Engine {
    fn drop(&mut self) {
        if !self.mem.get_mut().is_empty() {
            let _ = self.flush();
        }
    }
}

#[cfg(test)]
mod tests;
