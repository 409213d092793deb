//! Common test utilities for the subsets integration tests.

#![allow(dead_code)]

use ndarray::Array1;
use oblivious_subsets::*;
use rand::prelude::*;

/// Random targets in `[-5, 5)` and weights in `[0.5, 2)`.
pub fn create_targets(num_rows: usize, seed: u64) -> (Array1<f32>, Array1<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let targets = Array1::from_iter((0..num_rows).map(|_| rng.gen_range(-5.0..5.0)));
    let weights = Array1::from_iter((0..num_rows).map(|_| rng.gen_range(0.5..2.0)));
    (targets, weights)
}

/// Weighted target source over `mapping`.
pub fn create_source<M: Mapping>(num_rows: usize, seed: u64, mapping: M) -> L2Target<M> {
    let (targets, weights) = create_targets(num_rows, seed);
    L2Target::from_arrays(targets.view(), Some(weights.view()), mapping).unwrap()
}

/// Random binarized feature columns with values in `0..num_bins`.
pub fn create_feature_columns(
    num_rows: usize,
    num_features: usize,
    num_bins: u32,
    seed: u64,
) -> Vec<Vec<u32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_features)
        .map(|_| (0..num_rows).map(|_| rng.gen_range(0..num_bins)).collect())
        .collect()
}

/// Leaf index of every row in a tree of `depth` levels where level `k`
/// sends a row right when `columns[k][row] > thresholds[k]`.
pub fn leaf_indices(columns: &[Vec<u32>], thresholds: &[u32], depth: usize) -> Vec<u32> {
    let num_rows = columns.first().map_or(0, |c| c.len());
    (0..num_rows)
        .map(|row| {
            (0..depth).fold(0u32, |leaf, level| {
                leaf | (u32::from(columns[level][row] > thresholds[level]) << level)
            })
        })
        .collect()
}

/// Random fold id in `0..fold_count` for every row.
pub fn create_fold_ids(num_rows: usize, fold_count: u32, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_rows).map(|_| rng.gen_range(0..fold_count)).collect()
}

/// Check the structural invariants of every device shard:
/// the permutation covers all rows, is sorted by bin, and the active
/// partitions are contiguous runs whose statistics match their rows.
pub fn assert_subsets_invariants<M: SubsetsMapping>(
    subsets: &OptimizationSubsets<M>,
    source: &dyn TargetSource<M>,
) {
    let active = subsets.active_partition_count();
    for dev in 0..subsets.device_count() {
        let view = subsets.device_view(dev).unwrap();
        let num_rows = view.bins.len();

        let mut seen = vec![false; num_rows];
        for &row in view.indices {
            assert!(!seen[row as usize], "row {} appears twice on device {}", row, dev);
            seen[row as usize] = true;
        }
        assert!(seen.iter().all(|&s| s), "permutation incomplete on device {}", dev);

        let parts = view.current_partitions();
        assert_eq!(parts.len(), active);
        assert_eq!(view.partition_stats.len(), active);

        let mut expected_offset = 0;
        for (bin, part) in parts.iter().enumerate() {
            assert_eq!(part.offset, expected_offset, "gap before partition {}", bin);
            expected_offset = part.end();

            let rows = view.partition_rows(bin).unwrap();
            assert!(rows.iter().all(|&r| view.bins[r as usize] as usize == bin));

            let weighted_target = source.weighted_target(dev).unwrap();
            let weights = source.weights(dev).unwrap();
            let wt: f64 = rows.iter().map(|&r| f64::from(weighted_target[r as usize])).sum();
            let w: f64 = rows.iter().map(|&r| f64::from(weights[r as usize])).sum();
            let stats = view.partition_stats[bin];
            assert_eq!(stats.count, part.size as u64);
            approx::assert_relative_eq!(stats.weighted_target, wt, epsilon = 1e-9);
            approx::assert_relative_eq!(stats.weight, w, epsilon = 1e-9);
        }
        assert_eq!(expected_offset as usize, num_rows);
    }
}

/// Sum of weights over all active partitions.
pub fn total_partition_weight(stats: &[PartitionStatistics]) -> f64 {
    stats.iter().map(|s| s.weight).sum()
}
