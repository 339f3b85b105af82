use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mufwatch_core::{Reading, StationId, StoreConfig, WindowedStore};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Benchmark concurrent ingest throughput with varying thread counts
fn bench_concurrent_ingest_varying_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_ingest");

    for thread_count in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(*thread_count as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::new("threads", thread_count),
            thread_count,
            |b, &thread_count| {
                b.iter(|| {
                    let store = Arc::new(WindowedStore::new(StoreConfig::default()).unwrap());
                    let now = store.now_ms();

                    let mut handles_vec = vec![];

                    for t in 0..thread_count {
                        let store = Arc::clone(&store);
                        let station = if t % 2 == 0 {
                            StationId::roquetes()
                        } else {
                            StationId::arenosillo()
                        };
                        let join_handle = thread::spawn(move || {
                            for i in 0..1000u64 {
                                store
                                    .ingest(&station, black_box(Reading::Value(29.0)), now - i)
                                    .unwrap();
                            }
                        });
                        handles_vec.push(join_handle);
                    }

                    for join_handle in handles_vec {
                        join_handle.join().unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

/// Benchmark reads racing a writer on the same station
fn bench_reads_during_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("reads_during_ingest");

    for reader_count in [1, 4].iter() {
        group.throughput(Throughput::Elements(*reader_count as u64 * 100));
        group.bench_with_input(
            BenchmarkId::new("readers", reader_count),
            reader_count,
            |b, &reader_count| {
                b.iter(|| {
                    let store = Arc::new(WindowedStore::new(StoreConfig::default()).unwrap());
                    let now = store.now_ms();

                    let writer = {
                        let store = Arc::clone(&store);
                        thread::spawn(move || {
                            for i in 0..1000u64 {
                                store
                                    .ingest(&StationId::roquetes(), Reading::Value(30.0), now - i)
                                    .unwrap();
                            }
                        })
                    };

                    let readers: Vec<_> = (0..reader_count)
                        .map(|_| {
                            let store = Arc::clone(&store);
                            thread::spawn(move || {
                                for _ in 0..100 {
                                    black_box(store.latest());
                                    black_box(store.series(Duration::from_secs(600)));
                                }
                            })
                        })
                        .collect();

                    writer.join().unwrap();
                    for reader in readers {
                        reader.join().unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_concurrent_ingest_varying_threads,
    bench_reads_during_ingest,
);
criterion_main!(benches);
