use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rect_partition::prelude::*;
use rect_partition::union_find::partition_sequential;

fn detections(count: usize) -> Vec<Rect> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let cx = rng.random_range(0..8) * 60;
            let cy = rng.random_range(0..8) * 60;
            Rect::new(
                cx + rng.random_range(-4..=4),
                cy + rng.random_range(-4..=4),
                30 + rng.random_range(-2..=2),
                30 + rng.random_range(-2..=2),
            )
        })
        .collect()
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");

    for count in [32usize, 128, 256] {
        let rects = detections(count);
        let predicate = InSameComponent::new(0.2);

        group.bench_with_input(BenchmarkId::new("sequential", count), &rects, |b, rects| {
            b.iter(|| black_box(partition_sequential(rects, &predicate)))
        });

        for strategy in [AtomicMinStrategy::Native, AtomicMinStrategy::CompareRetry] {
            let partitioner = Partitioner::new(PartitionConfig {
                lanes: count,
                min_strategy: strategy,
                ..PartitionConfig::default()
            });
            group.bench_with_input(
                BenchmarkId::new(format!("group_{strategy:?}"), count),
                &rects,
                |b, rects| b.iter(|| black_box(partitioner.partition(rects))),
            );
        }
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let batches: Vec<Vec<Rect>> = (0..16).map(|_| detections(64)).collect();
    let partitioner = Partitioner::new(PartitionConfig::default());

    c.bench_function("partition_batch_16x64", |b| {
        b.iter(|| black_box(partitioner.partition_batch(&batches)))
    });
}

criterion_group!(benches, bench_partition, bench_batch);
criterion_main!(benches);
