//! Performance benchmarks for the document store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use freshdb::{Store, StoreConfig};
use serde_json::json;
use tempfile::TempDir;

fn create_store(dir: &TempDir) -> Store {
    Store::open(StoreConfig::new("bench").with_folder(dir.path())).unwrap()
}

/// Fill the document with `keys` small records.
fn populate(store: &Store, keys: usize) {
    for i in 0..keys {
        store
            .set(
                &format!("records.r{}", i),
                json!({"id": i, "name": format!("record {}", i), "tags": ["a", "b"]}),
            )
            .unwrap();
    }
}

/// Every call re-reads the whole file, so cost grows with document size.
fn bench_get_by_document_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_by_document_size");

    for keys in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("keys", keys), &keys, |b, &keys| {
            let dir = TempDir::new().unwrap();
            let store = create_store(&dir);
            populate(&store, keys);

            b.iter(|| {
                black_box(store.get("records.r0.name").unwrap());
            });
        });
    }

    group.finish();
}

fn bench_set_by_document_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_by_document_size");
    group.sample_size(20);

    for keys in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("keys", keys), &keys, |b, &keys| {
            let dir = TempDir::new().unwrap();
            let store = create_store(&dir);
            populate(&store, keys);

            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                black_box(store.set("counter", n).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_helpers(c: &mut Criterion) {
    let mut group = c.benchmark_group("helpers");
    group.sample_size(20);

    group.bench_function("push_pop", |b| {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        b.iter(|| {
            black_box(store.push("queue", [1]).unwrap());
            black_box(store.pop("queue").unwrap());
        });
    });

    group.bench_function("add", |b| {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        b.iter(|| {
            black_box(store.add("total", 1.0).unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_get_by_document_size,
    bench_set_by_document_size,
    bench_helpers,
);

criterion_main!(benches);
