use super::helpers::*;
use crate::*;
use anyhow::Result;
use tempfile::tempdir;

// --------------------- get ---------------------

#[test]
fn get_from_memtable() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;

    engine.upsert(b"k", b"v")?;
    assert_eq!(engine.get(b"k")?, b"v");
    assert_eq!(engine.run_count(), 0);
    Ok(())
}

#[test]
fn get_missing_is_not_found() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;

    assert!(engine.get(b"nope").unwrap_err().is_not_found());
    engine.upsert(b"a", b"1")?;
    engine.flush()?;
    assert!(matches!(engine.get(b"b"), Err(Error::NotFound)));
    Ok(())
}

#[test]
fn get_from_runs() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;

    engine.upsert(b"a", b"1")?;
    engine.flush()?;
    engine.upsert(b"b", b"2")?;
    engine.flush()?;

    assert_eq!(engine.run_count(), 2);
    assert_eq!(engine.get(b"a")?, b"1");
    assert_eq!(engine.get(b"b")?, b"2");
    Ok(())
}

#[test]
fn memtable_tombstone_shadows_run() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;

    engine.upsert(b"k", b"v")?;
    engine.flush()?;
    engine.remove(b"k")?;

    assert!(engine.get(b"k").unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn run_tombstone_shadows_older_run() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;

    engine.upsert(b"k", b"v")?;
    engine.flush()?;
    engine.remove(b"k")?;
    engine.flush()?;

    assert_eq!(engine.run_count(), 2);
    assert!(engine.get(b"k").unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn freshest_timestamp_wins_regardless_of_generation() -> Result<()> {
    let dir = tempdir()?;
    let (engine, clock) = open_at(dir.path(), 1 << 20, 1)?;

    // generation 0 gets the newer write
    clock.set(100);
    engine.upsert(b"k", b"newer")?;
    engine.flush()?;

    // generation 1 gets an older one
    clock.set(50);
    engine.upsert(b"k", b"older")?;
    engine.flush()?;

    assert_eq!(engine.run_generations(), vec![0, 1]);
    assert_eq!(engine.get(b"k")?, b"newer");
    assert_eq!(collect(engine.scan(b"")?)?, pairs(&[("k", "newer")]));
    Ok(())
}

#[test]
fn freshest_timestamp_wins_over_memtable() -> Result<()> {
    let dir = tempdir()?;
    let (engine, clock) = open_at(dir.path(), 1 << 20, 1)?;

    clock.set(100);
    engine.upsert(b"k", b"on-disk")?;
    engine.flush()?;

    clock.set(10);
    engine.upsert(b"k", b"stale")?;

    assert_eq!(engine.get(b"k")?, b"on-disk");
    Ok(())
}

// --------------------- scan ---------------------

#[test]
fn scan_merges_sources_in_order() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;

    engine.upsert(b"c", b"3")?;
    engine.upsert(b"a", b"1")?;
    engine.flush()?;
    engine.upsert(b"d", b"4")?;
    engine.flush()?;
    engine.upsert(b"b", b"2")?;

    assert_eq!(
        collect(engine.scan(b"")?)?,
        pairs(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")])
    );
    assert_eq!(collect(engine.scan(b"bb")?)?, pairs(&[("c", "3"), ("d", "4")]));
    assert!(collect(engine.scan(b"e")?)?.is_empty());
    Ok(())
}

#[test]
fn concrete_scenario() -> Result<()> {
    let dir = tempdir()?;
    {
        let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;
        engine.upsert(b"a", b"1")?;
        engine.upsert(b"b", b"2")?;
        engine.flush()?;
        assert_eq!(engine.run_generations(), vec![0]);

        engine.upsert(b"a", b"3")?;
        engine.remove(b"b")?;
        assert_eq!(collect(engine.scan(b"")?)?, pairs(&[("a", "3")]));
        engine.close()?;
    }

    let (engine, _) = open_at(dir.path(), 1 << 20, 1_000)?;
    assert_eq!(collect(engine.scan(b"")?)?, pairs(&[("a", "3")]));
    Ok(())
}

#[test]
fn scan_is_re_callable() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;
    engine.upsert(b"a", b"1")?;
    engine.flush()?;
    engine.upsert(b"b", b"2")?;

    let first = collect(engine.scan(b"")?)?;
    let second = collect(engine.scan(b"")?)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn scan_snapshot_ignores_later_writes() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;
    engine.upsert(b"a", b"1")?;

    let scan = engine.scan(b"")?;
    engine.upsert(b"b", b"2")?;
    engine.remove(b"a")?;

    assert_eq!(collect(scan)?, pairs(&[("a", "1")]));
    Ok(())
}

// --------------------- range ---------------------

#[test]
fn range_is_half_open() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;
    for k in ["a", "b", "c", "d"] {
        engine.upsert(k.as_bytes(), k.as_bytes())?;
    }
    engine.flush()?;
    engine.remove(b"b")?;

    assert_eq!(collect(engine.range(b"a", b"d")?)?, pairs(&[("a", "a"), ("c", "c")]));
    assert_eq!(collect(engine.range(b"b", b"c")?)?, Vec::new());
    assert_eq!(collect(engine.range(b"d", b"a")?)?, Vec::new());
    Ok(())
}

// --------------------- corruption ---------------------

#[test]
fn corrupt_cell_is_an_error_not_a_miss() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;
    engine.upsert(b"k", b"v")?;
    engine.flush()?;

    // overwrite the key length of the only cell in place
    let path = dir.path().join(sstable::format::run_file_name(0));
    let mut bytes = std::fs::read(&path)?;
    bytes[0] = 0x80;
    std::fs::write(&path, bytes)?;

    // the run's open handle sees the rewrite; footer and offsets still hold
    assert!(matches!(engine.get(b"k"), Err(Error::CorruptRun { .. })));

    // the scan's start position is found by binary search over the keys
    assert!(matches!(engine.scan(b""), Err(Error::CorruptRun { .. })));
    Ok(())
}

#[test]
fn scan_surfaces_corrupt_cell_then_stops() -> Result<()> {
    let dir = tempdir()?;
    let (engine, _) = open_at(dir.path(), 1 << 20, 1)?;
    engine.upsert(b"a", b"1")?;
    engine.upsert(b"b", b"2")?;
    engine.flush()?;

    // value length of cell "a": key_len(4) + key(1) + timestamp(8)
    let path = dir.path().join(sstable::format::run_file_name(0));
    let mut bytes = std::fs::read(&path)?;
    bytes[13] = 0x7f;
    std::fs::write(&path, bytes)?;

    let mut scan = engine.scan(b"")?;
    assert!(matches!(scan.next(), Some(Err(Error::CorruptRun { .. }))));
    assert!(scan.next().is_none());
    Ok(())
}
