use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use metric_space::{DimensionPath, Space};
use std::sync::Arc;
use std::thread;

const ADDS_PER_THREAD: usize = 10_000;
const ADDS_PER_BATCH: usize = 1_000;

fn bench_single_thread(c: &mut Criterion) {
    let root = DimensionPath::new();
    let shallow = root.extend(&["severity", "HIGH"]);
    let deep = shallow.extend(&["type", "rule", "id", "AWS.S3.Public", "source", "cloudtrail"]);

    let mut group = c.benchmark_group("space_add");
    for (label, path) in [("root", &root), ("depth_1", &shallow), ("depth_4", &deep)] {
        group.bench_function(label, |b| {
            // fresh space per batch so observation lists stay bounded
            b.iter_batched(
                Space::new,
                |space| {
                    for _ in 0..ADDS_PER_BATCH {
                        space.add(black_box("alerts"), path, 1.0);
                    }
                    space
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("space_add_contended");
    for threads in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("same_series", threads), &threads, |b, &threads| {
            b.iter(|| {
                let space = Arc::new(Space::new());
                let counter = space.counter("hits").with_dimensions(&["route", "/"]);
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let counter = counter.clone();
                        thread::spawn(move || {
                            for _ in 0..ADDS_PER_THREAD {
                                counter.add(1.0);
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("disjoint_series", threads), &threads, |b, &threads| {
            b.iter(|| {
                let space = Arc::new(Space::new());
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let worker = t.to_string();
                        let counter = space.counter("hits").with_dimensions(&["worker", worker.as_str()]);
                        thread::spawn(move || {
                            for _ in 0..ADDS_PER_THREAD {
                                counter.add(1.0);
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_thread, bench_contended);
criterion_main!(benches);
