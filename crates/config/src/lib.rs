//! # Config - engine tuning knobs
//!
//! A single [`EngineConfig`] describes where runs live and when the engine
//! flushes and compacts. Loading it from files or the environment is the
//! embedding application's business; this crate only holds the values and
//! checks them.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of runs above which a flush triggers full compaction.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 8;

/// Errors produced by [`EngineConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("compaction threshold must be at least 1")]
    ZeroCompactionThreshold,

    #[error("run directory must not be empty")]
    EmptyDir,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory used exclusively for run files. Must already exist.
    pub dir: PathBuf,

    /// Memtable byte estimate above which the memtable is flushed.
    /// `0` flushes after effectively every write.
    pub flush_threshold: u64,

    /// Compaction runs after a flush once the run count exceeds this.
    pub compaction_threshold: usize,

    /// Fsync the temp file before rename and the directory after it.
    pub sync_on_publish: bool,
}

impl EngineConfig {
    pub fn new(dir: impl Into<PathBuf>, flush_threshold: u64) -> Self {
        Self {
            dir: dir.into(),
            flush_threshold,
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            sync_on_publish: true,
        }
    }

    #[must_use]
    pub fn with_compaction_threshold(mut self, threshold: usize) -> Self {
        self.compaction_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_sync_on_publish(mut self, sync: bool) -> Self {
        self.sync_on_publish = sync;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checks the values that would make the engine misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDir);
        }
        if self.compaction_threshold == 0 {
            return Err(ConfigError::ZeroCompactionThreshold);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::new("/tmp/runs", 1024);
        assert_eq!(cfg.flush_threshold, 1024);
        assert_eq!(cfg.compaction_threshold, DEFAULT_COMPACTION_THRESHOLD);
        assert!(cfg.sync_on_publish);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn builders_override_defaults() {
        let cfg = EngineConfig::new("/tmp/runs", 0)
            .with_compaction_threshold(2)
            .with_sync_on_publish(false);
        assert_eq!(cfg.compaction_threshold, 2);
        assert!(!cfg.sync_on_publish);
    }

    #[test]
    fn zero_compaction_threshold_is_rejected() {
        let cfg = EngineConfig::new("/tmp/runs", 0).with_compaction_threshold(0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroCompactionThreshold));
    }

    #[test]
    fn empty_dir_is_rejected() {
        let cfg = EngineConfig::new("", 0);
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyDir));
    }
}
