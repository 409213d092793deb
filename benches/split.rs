//! Split advancement benchmarks for both distribution strategies.
//!
//! Run with: cargo bench --bench split

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array1;
use oblivious_subsets::*;
use rand::prelude::*;

const DEPTH: usize = 6;

fn generate(num_rows: usize, seed: u64) -> (Array1<f32>, Vec<Vec<u32>>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let targets = Array1::from_iter((0..num_rows).map(|_| rng.gen_range(-1.0..1.0)));
    let columns = (0..DEPTH)
        .map(|_| (0..num_rows).map(|_| rng.gen_range(0..64)).collect())
        .collect();
    (targets, columns)
}

fn leaves(columns: &[Vec<u32>], level: usize) -> Vec<u32> {
    (0..columns[0].len())
        .map(|row| (0..=level).fold(0, |leaf, k| leaf | (u32::from(columns[k][row] > 31) << k)))
        .collect()
}

fn bench_mirror_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("split/mirror_tree");
    for &num_rows in &[10_000usize, 100_000] {
        let (targets, columns) = generate(num_rows, 42);
        let mapping = MirrorMapping::new(num_rows, 2);
        let source = L2Target::from_arrays(targets.view(), None, mapping.clone()).unwrap();
        let doc_map = DeviceBuffer::sequence(mapping.clone());
        let levels: Vec<_> = (0..DEPTH)
            .map(|level| DeviceBuffer::from_host(&leaves(&columns, level), mapping.clone()).unwrap())
            .collect();

        group.throughput(Throughput::Elements((num_rows * DEPTH) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(num_rows), &num_rows, |b, _| {
            b.iter(|| {
                let mut subsets = MirrorSubsets::create_subsets(DEPTH as u32, &source).unwrap();
                for next_level in &levels {
                    MirrorSubsets::split(&source, next_level, &doc_map, &mut subsets).unwrap();
                }
                black_box(subsets.active_partition_count())
            })
        });
    }
    group.finish();
}

fn bench_stripe_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("split/stripe_tree");
    for &num_devices in &[1usize, 4] {
        let num_rows = 100_000;
        let (targets, columns) = generate(num_rows, 7);
        let mapping = StripeMapping::split_to_devices(num_rows, num_devices);
        let source = L2Target::from_arrays(targets.view(), None, mapping.clone()).unwrap();
        let mut builder = CompressedIndexBuilder::new(mapping.clone());
        for column in &columns {
            builder.add_feature(column, false).unwrap();
        }
        let cindex = builder.build();
        let docs = DeviceBuffer::sequence(mapping);

        group.throughput(Throughput::Elements((num_rows * DEPTH) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(num_devices), &num_devices, |b, _| {
            b.iter(|| {
                let mut subsets = StripeSubsets::create_subsets(DEPTH as u32, &source).unwrap();
                for level in 0..DEPTH {
                    let feature = cindex.feature(level).unwrap();
                    StripeSubsets::split(&source, &cindex, &docs, feature, 31, &mut subsets).unwrap();
                }
                black_box(subsets.active_partition_count())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mirror_tree, bench_stripe_tree);
criterion_main!(benches);
