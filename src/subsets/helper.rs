//! Strategy-generic operations shared by the mirrored and sharded helpers.

use crate::core::error::Result;
use crate::core::types::{BinIndex, DataPartition, DeviceId, PartitionStatistics};
use crate::device::{DeviceBuffer, Mapping, SubsetsMapping};
use crate::subsets::OptimizationSubsets;
use crate::target::TargetSource;

/// Read-only view of the active partitions on every device.
#[derive(Debug, Clone)]
pub struct PartitionsView<'a, M: SubsetsMapping> {
    mapping: M,
    shards: Vec<&'a [DataPartition]>,
}

impl<'a, M: SubsetsMapping> PartitionsView<'a, M> {
    pub(crate) fn new(subsets: &'a OptimizationSubsets<M>) -> Self {
        let active = subsets.active_partition_count();
        let shards = subsets
            .partitions
            .shards()
            .iter()
            .map(|shard| &shard[..active.min(shard.len())])
            .collect();
        PartitionsView {
            mapping: subsets.mapping().partition_table(active),
            shards,
        }
    }

    /// Layout of the active table: `2^(depth + fold_bits)` entries per device.
    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    /// Active partitions of `dev`.
    pub fn device_view(&self, dev: DeviceId) -> Result<&'a [DataPartition]> {
        self.mapping.check_device(dev)?;
        Ok(self.shards[dev])
    }

    /// Active partitions per device.
    pub fn shards(&self) -> &[&'a [DataPartition]] {
        &self.shards
    }

    /// Number of active partitions.
    pub fn partition_count(&self) -> usize {
        self.shards.first().map_or(0, |shard| shard.len())
    }
}

/// Construction and inspection of subsets for one distribution strategy.
pub trait SubsetsHelper {
    /// Row layout the strategy works on.
    type Mapping: SubsetsMapping;

    /// The active prefix of the partition table on every device.
    fn current_parts_view(
        subsets: &OptimizationSubsets<Self::Mapping>,
    ) -> PartitionsView<'_, Self::Mapping> {
        PartitionsView::new(subsets)
    }

    /// Subsets sized for `max_depth` levels with every row in bin 0 and the
    /// identity permutation, statistics already computed.
    fn create_subsets<S>(max_depth: u32, source: &S) -> Result<OptimizationSubsets<Self::Mapping>>
    where
        S: TargetSource<Self::Mapping> + ?Sized,
    {
        OptimizationSubsets::build(max_depth, 0, None, source)
    }

    /// Subsets whose initial bins are the per-row fold ids in
    /// `0..fold_count`, with the permutation grouped by fold.
    fn create_subsets_with_folds<S>(
        max_depth: u32,
        fold_count: u32,
        fold_ids: &DeviceBuffer<BinIndex, Self::Mapping>,
        source: &S,
    ) -> Result<OptimizationSubsets<Self::Mapping>>
    where
        S: TargetSource<Self::Mapping> + ?Sized,
    {
        OptimizationSubsets::build(max_depth, fold_count, Some(fold_ids), source)
    }

    /// Statistics of each active partition over all rows of all devices.
    fn global_partition_stats(
        subsets: &OptimizationSubsets<Self::Mapping>,
    ) -> Result<Vec<PartitionStatistics>>;
}
