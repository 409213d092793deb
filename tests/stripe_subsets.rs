//! Integration tests for the row-sharded strategy.

mod common;

use approx::assert_relative_eq;
use common::*;
use oblivious_subsets::*;

fn build_index(columns: &[Vec<u32>], mapping: &StripeMapping) -> CompressedIndex {
    let mut builder = CompressedIndexBuilder::new(mapping.clone());
    for column in columns {
        builder.add_feature(column, false).unwrap();
    }
    builder.build()
}

#[test]
fn test_construction_replicates_partition_table() {
    let num_rows = 103;
    let mapping = StripeMapping::split_to_devices(num_rows, 4);
    let source = create_source(num_rows, 31, mapping.clone());
    let subsets = StripeSubsets::create_subsets(3, &source).unwrap();

    assert_eq!(subsets.partitions().mapping(), &StripeMapping::repeat_on_all_devices(8, 4));
    for dev in 0..4 {
        let view = subsets.device_view(dev).unwrap();
        let rows = mapping.device_size(dev);
        assert_eq!(view.bins.len(), rows);
        assert!(view.bins.iter().all(|&b| b == 0));
        assert_eq!(view.indices, (0..rows as u32).collect::<Vec<_>>().as_slice());
        assert_eq!(view.partitions.len(), 8);
        assert_eq!(view.current_partitions(), &[DataPartition::new(0, rows as u32)]);
    }
    assert_subsets_invariants(&subsets, &source);

    let stats = StripeSubsets::global_partition_stats(&subsets).unwrap();
    assert_eq!(stats[0].count, num_rows as u64);
    assert_relative_eq!(stats[0].weight, source.total_weight(), epsilon = 1e-6);
}

#[test]
fn test_split_levels_from_compressed_index() {
    let num_rows = 400;
    let max_depth = 4;
    let mapping = StripeMapping::split_to_devices(num_rows, 3);
    let source = create_source(num_rows, 41, mapping.clone());
    let columns = create_feature_columns(num_rows, max_depth, 32, 42);
    let thresholds = [15, 3, 27, 9];
    let cindex = build_index(&columns, &mapping);
    let docs = DeviceBuffer::sequence(mapping.clone());

    let mut subsets = StripeSubsets::create_subsets(max_depth as u32, &source).unwrap();
    for level in 0..max_depth {
        let feature = cindex.feature(level).unwrap();
        StripeSubsets::split(&source, &cindex, &docs, feature, thresholds[level], &mut subsets)
            .unwrap();

        assert_eq!(subsets.current_depth(), level as u32 + 1);
        assert_subsets_invariants(&subsets, &source);

        let expected = leaf_indices(&columns, &thresholds, level + 1);
        assert_eq!(subsets.bins().to_host(), expected);

        let parts = StripeSubsets::current_parts_view(&subsets);
        assert_eq!(parts.partition_count(), 1 << (level + 1));
        let sizes: u32 = parts
            .shards()
            .iter()
            .map(|shard| shard.iter().map(|p| p.size).sum::<u32>())
            .sum();
        assert_eq!(sizes as usize, num_rows);

        let stats = StripeSubsets::global_partition_stats(&subsets).unwrap();
        assert_relative_eq!(total_partition_weight(&stats), source.total_weight(), epsilon = 1e-6);
    }
}

#[test]
fn test_split_with_folds() {
    let num_rows = 90;
    let mapping = StripeMapping::split_to_devices(num_rows, 2);
    let source = create_source(num_rows, 51, mapping.clone());
    let fold_ids = create_fold_ids(num_rows, 2, 52);
    let folds = DeviceBuffer::from_host(&fold_ids, mapping.clone()).unwrap();
    let columns = create_feature_columns(num_rows, 1, 4, 53);
    let cindex = build_index(&columns, &mapping);
    let docs = DeviceBuffer::sequence(mapping);

    let mut subsets = StripeSubsets::create_subsets_with_folds(2, 2, &folds, &source).unwrap();
    assert_eq!(subsets.fold_bits(), 1);
    assert_subsets_invariants(&subsets, &source);

    StripeSubsets::split(&source, &cindex, &docs, cindex.feature(0).unwrap(), 1, &mut subsets).unwrap();
    assert_eq!(subsets.active_partition_count(), 4);
    assert_subsets_invariants(&subsets, &source);

    let bins = subsets.bins().to_host();
    for row in 0..num_rows {
        let right = u32::from(columns[0][row] > 1);
        assert_eq!(bins[row], fold_ids[row] | (right << 1));
    }
}

#[test]
fn test_partition_views_per_device() {
    let mapping = StripeMapping::from_sizes(&[3, 0, 2]);
    let source = create_source(5, 61, mapping.clone());
    let subsets = StripeSubsets::create_subsets(2, &source).unwrap();
    let parts = StripeSubsets::current_parts_view(&subsets);

    assert_eq!(parts.mapping().device_count(), 3);
    assert_eq!(parts.device_view(0).unwrap(), &[DataPartition::new(0, 3)]);
    assert_eq!(parts.device_view(1).unwrap(), &[DataPartition::new(0, 0)]);
    assert_eq!(parts.device_view(2).unwrap(), &[DataPartition::new(0, 2)]);
    assert!(parts.device_view(3).is_err());
}
