//! Timestamp sources.
//!
//! Every write is stamped by a [`Clock`] owned by the engine instance, so two
//! engines in one process never share counter state and tests can pin
//! timestamps with [`ManualClock`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of strictly increasing timestamps.
///
/// Implementations must never return `0` (a tombstone at timestamp zero
/// cannot be told apart from live data on disk) nor anything above
/// `i64::MAX`.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> u64;

    /// Raises the floor so every later `now()` is greater than `ts`.
    ///
    /// Called at startup with the newest timestamp found on disk.
    fn observe(&self, ts: u64);
}

/// Wall-clock nanoseconds, bumped by one whenever the wall clock stalls or
/// steps backwards.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn wall_nanos() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0)
            .clamp(1, i64::MAX as u64)
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        let wall = Self::wall_nanos();
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(wall.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);
        wall.max(prev + 1)
    }

    fn observe(&self, ts: u64) {
        self.last.fetch_max(ts.min(i64::MAX as u64), Ordering::AcqRel);
    }
}

/// Deterministic clock: hands out `start, start + 1, ...`.
#[derive(Debug)]
pub struct ManualClock {
    next: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }

    /// Moves the clock so the next call to `now` returns `ts`.
    pub fn set(&self, ts: u64) {
        self.next.store(ts.max(1), Ordering::Release);
    }

    /// The value the next call to `now` will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.next.fetch_add(1, Ordering::AcqRel)
    }

    fn observe(&self, ts: u64) {
        self.next.fetch_max(ts.saturating_add(1), Ordering::AcqRel);
    }
}
