use crate::{Engine, EngineConfig, ManualClock, Result, Scan};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Opens an engine whose clock starts at `start` and counts up by one.
pub fn open_at(dir: &Path, flush_threshold: u64, start: u64) -> Result<(Engine, Arc<ManualClock>)> {
    let clock = Arc::new(ManualClock::new(start));
    let cfg = EngineConfig::new(dir, flush_threshold).with_sync_on_publish(false);
    let engine = Engine::open_with(cfg, clock.clone())?;
    Ok((engine, clock))
}

/// Like [`open_at`] with a custom compaction threshold.
pub fn open_compacting_at(
    dir: &Path,
    flush_threshold: u64,
    compaction_threshold: usize,
    start: u64,
) -> Result<(Engine, Arc<ManualClock>)> {
    let clock = Arc::new(ManualClock::new(start));
    let cfg = EngineConfig::new(dir, flush_threshold)
        .with_compaction_threshold(compaction_threshold)
        .with_sync_on_publish(false);
    let engine = Engine::open_with(cfg, clock.clone())?;
    Ok((engine, clock))
}

pub fn collect(scan: Scan) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    scan.collect()
}

pub fn pairs(items: &[(&str, &str)]) -> Vec<(Vec<u8>, Vec<u8>)> {
    items
        .iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect()
}

pub fn count_run_files(dir: &Path) -> usize {
    file_names(dir)
        .iter()
        .filter(|n| sstable::format::is_run_file(n))
        .count()
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}
