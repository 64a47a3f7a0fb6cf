use bucket::Bucket;
use bucketstore::DirectoryRegistry;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Serialize, Deserialize)]
struct Record {
    id: u64,
    name: String,
    tags: Vec<String>,
    score: f64,
}

fn record(id: u64) -> Record {
    Record {
        id,
        name: format!("record {}", id),
        tags: vec!["alpha".to_string(), "beta".to_string()],
        score: id as f64 * 0.5,
    }
}

fn open(dir: &TempDir) -> Bucket {
    Bucket::builder(dir.path(), 64 * 1024 * 1024)
        .with_registry(DirectoryRegistry::new())
        .build()
        .unwrap()
}

fn bench_typed_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("typed_put");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("put_record", |b| {
        let dir = TempDir::new().unwrap();
        let bucket = open(&dir);

        let mut counter = 0u64;
        b.iter(|| {
            bucket.put(&format!("record{}", counter % 1000), &record(counter)).unwrap();
            counter += 1;
        });
    });

    group.finish();
}

fn bench_typed_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("typed_get");
    group.sample_size(50);
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_record", |b| {
        let dir = TempDir::new().unwrap();
        let bucket = open(&dir);
        for i in 0..100 {
            bucket.put(&format!("record{}", i), &record(i)).unwrap();
        }

        let mut counter = 0u64;
        b.iter(|| {
            let key = format!("record{}", counter % 100);
            black_box(bucket.get::<Record>(&key).unwrap());
            counter += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_typed_put, bench_typed_get);
criterion_main!(benches);
