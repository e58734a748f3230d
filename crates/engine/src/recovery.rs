/// Cold start: stale temp-file cleanup and run discovery.
///
/// Directory scanning happens here and nowhere else. Once the engine is
/// open, its run list is the only authority on which runs exist.
use sstable::format::{is_run_file, is_temp_file, parse_generation};
use sstable::SSTable;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::{Error, Result, Run};

/// Deletes `*.tmp` files left behind by interrupted flushes or compactions.
pub(crate) fn cleanup_temp_files(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let p = entry.path();
        let is_temp = p
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_temp_file);
        if !is_temp {
            continue;
        }
        match fs::remove_file(&p) {
            Ok(()) => debug!(path = %p.display(), "removed stale temp run"),
            Err(e) => warn!(path = %p.display(), error = %e, "failed to remove stale temp run"),
        }
    }
}

/// Opens every run file in `dir`, ordered by generation.
///
/// # Errors
///
/// [`Error::Init`] if any run fails to open: serving a partial dataset is
/// worse than not starting.
pub(crate) fn load_runs(dir: &Path) -> Result<Vec<Run>> {
    let mut found: Vec<(u64, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_run_file(name) {
            found.push((parse_generation(name), entry.path()));
        }
    }
    found.sort();

    found
        .into_iter()
        .map(|(generation, path)| match SSTable::open(&path) {
            Ok(table) => {
                debug!(generation, rows = table.rows(), path = %path.display(), "loaded run");
                Ok(Run {
                    generation,
                    table: Arc::new(table),
                })
            }
            Err(source) => {
                error!(path = %path.display(), error = %source, "run failed to open");
                Err(Error::Init { path, source })
            }
        })
        .collect()
}

/// Newest timestamp stored in any run, `0` when there is none.
///
/// Reads every cell once, so a corrupt cell also fails startup.
pub(crate) fn max_timestamp(runs: &[Run]) -> Result<u64> {
    let mut max = 0;
    for run in runs {
        let cells = run.table.scan(&[]).and_then(|scan| {
            scan.map(|cell| cell.map(|c| c.timestamp()))
                .try_fold(0u64, |acc, ts| ts.map(|ts| acc.max(ts)))
        });
        match cells {
            Ok(run_max) => max = max.max(run_max),
            Err(source) => {
                let path = run.table.path().to_path_buf();
                error!(path = %path.display(), error = %source, "run failed to read");
                return Err(Error::Init { path, source });
            }
        }
    }
    Ok(max)
}

/// Generation the next flush or compaction will use, `None` once
/// `u64::MAX` has been handed out.
pub(crate) fn next_generation(runs: &[Run]) -> Option<u64> {
    runs.iter()
        .map(|r| r.generation)
        .max()
        .map_or(Some(0), |g| g.checked_add(1))
}
