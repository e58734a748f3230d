use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::{Engine, EngineConfig, MonotonicClock};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

const N_KEYS: usize = 10_000;
const VALUE_SIZE: usize = 100;
/// Roughly a tenth of the data set per run.
const FLUSH_THRESHOLD: u64 = 128 * 1024;

fn open(dir: &TempDir) -> Engine {
    let cfg = EngineConfig::new(dir.path(), FLUSH_THRESHOLD).with_sync_on_publish(false);
    Engine::open_with(cfg, Arc::new(MonotonicClock::new())).unwrap()
}

fn loaded_engine() -> (TempDir, Engine) {
    let dir = tempdir().unwrap();
    let engine = open(&dir);
    for i in 0..N_KEYS {
        engine
            .upsert(format!("key{}", i).as_bytes(), &[b'x'; VALUE_SIZE])
            .unwrap();
    }
    engine.flush().unwrap();
    (dir, engine)
}

fn engine_upsert_benchmark(c: &mut Criterion) {
    c.bench_function("engine_upsert_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let engine = open(&dir);
                (dir, engine)
            },
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    engine
                        .upsert(format!("key{}", i).as_bytes(), &[b'x'; VALUE_SIZE])
                        .unwrap();
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn engine_get_hit_benchmark(c: &mut Criterion) {
    let (_dir, engine) = loaded_engine();
    c.bench_function("engine_get_hit_10k", |b| {
        b.iter(|| {
            for i in 0..N_KEYS {
                let key = format!("key{}", i).into_bytes();
                assert!(engine.get(&key).is_ok());
            }
        });
    });
}

fn engine_get_miss_benchmark(c: &mut Criterion) {
    let (_dir, engine) = loaded_engine();
    c.bench_function("engine_get_miss_10k", |b| {
        b.iter(|| {
            for i in 0..N_KEYS {
                let key = format!("missing{}", i).into_bytes();
                assert!(engine.get(&key).unwrap_err().is_not_found());
            }
        });
    });
}

fn engine_scan_benchmark(c: &mut Criterion) {
    let (_dir, engine) = loaded_engine();
    c.bench_function("engine_full_scan_10k", |b| {
        b.iter(|| {
            let n = engine.scan(b"").unwrap().count();
            assert_eq!(n, N_KEYS);
        });
    });
}

fn engine_compact_benchmark(c: &mut Criterion) {
    c.bench_function("engine_compact_10k", |b| {
        b.iter_batched(
            loaded_engine,
            |(_dir, engine)| engine.compact().unwrap(),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    engine_upsert_benchmark,
    engine_get_hit_benchmark,
    engine_get_miss_benchmark,
    engine_scan_benchmark,
    engine_compact_benchmark
);
criterion_main!(benches);
