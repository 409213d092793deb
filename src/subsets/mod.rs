//! Multi-device optimization subsets for oblivious (symmetric) tree growth.
//!
//! An [`OptimizationSubsets`] holds, for every device shard:
//!
//! - `bins`: the current leaf of every row. Bits `0..fold_bits` carry the
//!   fold id, bit `fold_bits + k` carries the direction taken at level `k`.
//! - `indices`: a stable permutation of the local rows grouped by bin.
//! - `partitions`: `{offset, size}` of each active leaf within `indices`.
//! - `partition_stats`: weighted-target, weight and row count per leaf.
//! - `weighted_target` / `weights`: per-row values gathered in permuted order.
//!
//! Splitting adds one bit to every bin, reorders the permutation on that bit
//! and refreshes the partitions and statistics. The strategy-specific split
//! entry points live on [`MirrorSubsets`] and [`StripeSubsets`].

pub mod helper;
pub mod mirror;
pub mod stats;
pub mod stripe;

pub use helper::{PartitionsView, SubsetsHelper};
pub use mirror::MirrorSubsets;
pub use stats::update_subsets_stats;
pub use stripe::StripeSubsets;

use crate::core::constants::{MAX_DEPTH_LIMIT, MAX_FOLD_BITS};
use crate::core::error::{Result, SubsetsError};
use crate::ensure;
use crate::core::types::{
    active_partition_count, fold_bits, BinIndex, DataPartition, DeviceId, DistributionType, Label,
    PartitionStatistics, RowIndex,
};
use crate::device::{run_on_devices, DeviceBuffer, Mapping, SubsetsMapping};
use crate::kernels;
use crate::target::TargetSource;
use serde::{Deserialize, Serialize};

/// Partition state of one oblivious tree being grown over all devices.
#[derive(Debug, Clone)]
pub struct OptimizationSubsets<M: SubsetsMapping> {
    pub(crate) bins: DeviceBuffer<BinIndex, M>,
    pub(crate) indices: DeviceBuffer<RowIndex, M>,
    pub(crate) partitions: DeviceBuffer<DataPartition, M>,
    pub(crate) partition_stats: DeviceBuffer<PartitionStatistics, M>,
    pub(crate) weighted_target: DeviceBuffer<Label, M>,
    pub(crate) weights: DeviceBuffer<Label, M>,
    pub(crate) fold_count: u32,
    pub(crate) current_depth: u32,
    pub(crate) fold_bits: u32,
    pub(crate) max_depth: u32,
}

impl<M: SubsetsMapping> OptimizationSubsets<M> {
    /// Allocate for `max_depth` levels over the rows of `source`, assign
    /// initial bins and run the first stats refresh.
    ///
    /// Without `fold_ids` every row starts in bin 0. With `fold_ids` the
    /// initial bin of each row is its fold id and the permutation is grouped
    /// by fold.
    pub(crate) fn build<S>(
        max_depth: u32,
        fold_count: u32,
        fold_ids: Option<&DeviceBuffer<BinIndex, M>>,
        source: &S,
    ) -> Result<Self>
    where
        S: TargetSource<M> + ?Sized,
    {
        if max_depth > MAX_DEPTH_LIMIT {
            return Err(SubsetsError::invalid_parameter(
                "max_depth",
                max_depth.to_string(),
                format!("must be at most {}", MAX_DEPTH_LIMIT),
            ));
        }
        let fold_bits = fold_bits(fold_count);
        if fold_bits > MAX_FOLD_BITS {
            return Err(SubsetsError::invalid_parameter(
                "fold_count",
                fold_count.to_string(),
                format!("needs {} bits, at most {} supported", fold_bits, MAX_FOLD_BITS),
            ));
        }

        let rows = source.mapping().clone();
        let capacity = active_partition_count(max_depth, fold_bits);
        let mut subsets = OptimizationSubsets {
            bins: DeviceBuffer::new(rows.clone()),
            indices: DeviceBuffer::new(rows.clone()),
            partitions: DeviceBuffer::new(rows.partition_table(capacity)),
            partition_stats: DeviceBuffer::new(rows.partition_table(capacity)),
            weighted_target: DeviceBuffer::new(rows.clone()),
            weights: DeviceBuffer::new(rows.clone()),
            fold_count,
            current_depth: 0,
            fold_bits,
            max_depth,
        };

        match fold_ids {
            None => {
                let tasks: Vec<_> = subsets
                    .bins
                    .shards_mut()
                    .iter_mut()
                    .zip(subsets.indices.shards_mut().iter_mut())
                    .collect();
                run_on_devices("init_subsets", tasks, |(bins, indices)| {
                    kernels::fill_buffer(bins, 0);
                    kernels::make_sequence(indices);
                    Ok(())
                })?;
            }
            Some(fold_ids) => {
                if fold_ids.mapping() != &rows {
                    return Err(SubsetsError::dimension_mismatch(
                        format!("fold ids laid out as {:?}", rows),
                        format!("{:?}", fold_ids.mapping()),
                    ));
                }
                let tasks: Vec<_> = subsets
                    .bins
                    .shards_mut()
                    .iter_mut()
                    .zip(subsets.indices.shards_mut().iter_mut())
                    .zip(fold_ids.shards())
                    .collect();
                run_on_devices("init_fold_subsets", tasks, |((bins, indices), folds)| {
                    if let Some(&fold) = folds.iter().find(|&&fold| fold >= fold_count) {
                        return Err(SubsetsError::invalid_parameter(
                            "fold_ids",
                            fold.to_string(),
                            format!("fold id must be below fold count {}", fold_count),
                        ));
                    }
                    bins.copy_from_slice(folds);
                    kernels::make_sequence(indices);
                    kernels::reorder_bins(bins, indices, 0, fold_bits)
                })?;
            }
        }

        log::debug!(
            "Created {} subsets: {} rows on {} devices, max depth {}, {} folds",
            M::DISTRIBUTION,
            rows.total_size(),
            rows.device_count(),
            max_depth,
            fold_count
        );

        update_subsets_stats(source, &mut subsets)?;
        Ok(subsets)
    }

    /// Row layout of the per-row buffers.
    pub fn mapping(&self) -> &M {
        self.bins.mapping()
    }

    /// Number of devices.
    pub fn device_count(&self) -> usize {
        self.bins.device_count()
    }

    /// Number of folds (0 when built without folds).
    pub fn fold_count(&self) -> u32 {
        self.fold_count
    }

    /// Number of splits applied so far.
    pub fn current_depth(&self) -> u32 {
        self.current_depth
    }

    /// Low bin bits reserved for the fold id.
    pub fn fold_bits(&self) -> u32 {
        self.fold_bits
    }

    /// Largest depth the partition table was sized for.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// `2^(current_depth + fold_bits)`
    pub fn active_partition_count(&self) -> usize {
        active_partition_count(self.current_depth, self.fold_bits)
    }

    /// Allocated partition table entries, `2^(max_depth + fold_bits)`.
    pub fn partition_capacity(&self) -> usize {
        active_partition_count(self.max_depth, self.fold_bits)
    }

    /// Per-row bins.
    pub fn bins(&self) -> &DeviceBuffer<BinIndex, M> {
        &self.bins
    }

    /// Bin-grouped row permutation.
    pub fn indices(&self) -> &DeviceBuffer<RowIndex, M> {
        &self.indices
    }

    /// Full partition table, including entries above the active count.
    pub fn partitions(&self) -> &DeviceBuffer<DataPartition, M> {
        &self.partitions
    }

    /// Statistics of the active partitions.
    pub fn partition_stats(&self) -> &DeviceBuffer<PartitionStatistics, M> {
        &self.partition_stats
    }

    /// Weighted target values in permuted order.
    pub fn weighted_target(&self) -> &DeviceBuffer<Label, M> {
        &self.weighted_target
    }

    /// Weights in permuted order.
    pub fn weights(&self) -> &DeviceBuffer<Label, M> {
        &self.weights
    }

    /// Read-only projection of one device's state.
    pub fn device_view(&self, dev: DeviceId) -> Result<SubsetsView<'_>> {
        Ok(SubsetsView {
            device: dev,
            bins: self.bins.device_view(dev)?,
            indices: self.indices.device_view(dev)?,
            partitions: self.partitions.device_view(dev)?,
            partition_stats: self.partition_stats.device_view(dev)?,
            weighted_target: self.weighted_target.device_view(dev)?,
            weights: self.weights.device_view(dev)?,
            fold_count: self.fold_count,
            current_depth: self.current_depth,
            fold_bits: self.fold_bits,
        })
    }

    /// Writable projections of every device, in device order.
    pub(crate) fn device_views_mut(&mut self) -> Vec<SubsetsViewMut<'_>> {
        let (current_depth, fold_bits) = (self.current_depth, self.fold_bits);
        self.bins
            .shards_mut()
            .iter_mut()
            .zip(self.indices.shards_mut().iter_mut())
            .zip(self.partitions.shards_mut().iter_mut())
            .zip(self.partition_stats.shards_mut().iter_mut())
            .zip(self.weighted_target.shards_mut().iter_mut())
            .zip(self.weights.shards_mut().iter_mut())
            .enumerate()
            .map(
                |(device, (((((bins, indices), partitions), partition_stats), weighted_target), weights))| {
                    SubsetsViewMut {
                        device,
                        bins,
                        indices,
                        partitions,
                        partition_stats,
                        weighted_target,
                        weights,
                        current_depth,
                        fold_bits,
                    }
                },
            )
            .collect()
    }

    pub(crate) fn ensure_can_split(&self) -> Result<()> {
        if self.current_depth >= self.max_depth {
            return Err(SubsetsError::depth_exceeded(self.current_depth, self.max_depth));
        }
        Ok(())
    }

    /// Stable reorder of every device's permutation on the bin bit written
    /// by the current level.
    pub(crate) fn reorder_on_level_bit(&mut self) -> Result<()> {
        let offset = self.current_depth + self.fold_bits;
        let tasks: Vec<_> = self
            .bins
            .shards()
            .iter()
            .zip(self.indices.shards_mut().iter_mut())
            .collect();
        run_on_devices("reorder_bins", tasks, |(bins, indices)| {
            kernels::reorder_bins(bins, indices, offset, 1)
        })
    }

    /// Copy of the observable state, restricted to the active partitions.
    pub fn snapshot(&self) -> SubsetsSnapshot {
        let active = self.active_partition_count();
        SubsetsSnapshot {
            distribution: M::DISTRIBUTION,
            fold_count: self.fold_count,
            fold_bits: self.fold_bits,
            current_depth: self.current_depth,
            max_depth: self.max_depth,
            bins: self.bins.shards().to_vec(),
            indices: self.indices.shards().to_vec(),
            partitions: self
                .partitions
                .shards()
                .iter()
                .map(|shard| shard[..active.min(shard.len())].to_vec())
                .collect(),
            partition_stats: self.partition_stats.shards().to_vec(),
        }
    }
}

/// One device's read-only state, as consumed by histogram and scoring code.
#[derive(Debug, Clone, Copy)]
pub struct SubsetsView<'a> {
    /// Device this view belongs to
    pub device: DeviceId,
    /// Per-row bins
    pub bins: &'a [BinIndex],
    /// Bin-grouped permutation of local rows
    pub indices: &'a [RowIndex],
    /// Full partition table
    pub partitions: &'a [DataPartition],
    /// Statistics of the active partitions
    pub partition_stats: &'a [PartitionStatistics],
    /// Weighted target in permuted order
    pub weighted_target: &'a [Label],
    /// Weights in permuted order
    pub weights: &'a [Label],
    /// Number of folds
    pub fold_count: u32,
    /// Splits applied so far
    pub current_depth: u32,
    /// Bits reserved for the fold id
    pub fold_bits: u32,
}

impl<'a> SubsetsView<'a> {
    /// `2^(current_depth + fold_bits)`
    pub fn active_partition_count(&self) -> usize {
        active_partition_count(self.current_depth, self.fold_bits)
    }

    /// The active prefix of the partition table.
    pub fn current_partitions(&self) -> &'a [DataPartition] {
        let active = self.active_partition_count().min(self.partitions.len());
        &self.partitions[..active]
    }

    /// Permuted rows of active partition `partition`.
    pub fn partition_rows(&self, partition: usize) -> Option<&'a [RowIndex]> {
        let part = self.current_partitions().get(partition)?;
        self.indices.get(part.range())
    }
}

/// Writable projection of one device, handed to the stage kernels.
#[derive(Debug)]
pub(crate) struct SubsetsViewMut<'a> {
    pub(crate) device: DeviceId,
    pub(crate) bins: &'a mut [BinIndex],
    pub(crate) indices: &'a mut [RowIndex],
    pub(crate) partitions: &'a mut [DataPartition],
    pub(crate) partition_stats: &'a mut [PartitionStatistics],
    pub(crate) weighted_target: &'a mut [Label],
    pub(crate) weights: &'a mut [Label],
    pub(crate) current_depth: u32,
    pub(crate) fold_bits: u32,
}

impl<'a> SubsetsViewMut<'a> {
    pub(crate) fn active_partition_count(&self) -> usize {
        active_partition_count(self.current_depth, self.fold_bits)
    }
}

/// Serializable copy of an [`OptimizationSubsets`].
///
/// Two runs over the same inputs produce byte-identical snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetsSnapshot {
    /// Strategy the subsets were built with
    pub distribution: DistributionType,
    /// Number of folds
    pub fold_count: u32,
    /// Bits reserved for the fold id
    pub fold_bits: u32,
    /// Splits applied
    pub current_depth: u32,
    /// Depth the table was sized for
    pub max_depth: u32,
    /// Per-device bins
    pub bins: Vec<Vec<BinIndex>>,
    /// Per-device permutations
    pub indices: Vec<Vec<RowIndex>>,
    /// Per-device active partitions
    pub partitions: Vec<Vec<DataPartition>>,
    /// Per-device active statistics
    pub partition_stats: Vec<Vec<PartitionStatistics>>,
}

impl SubsetsSnapshot {
    /// Binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a snapshot written by [`SubsetsSnapshot::to_bytes`].
    ///
    /// Decoded buffers must agree on the device count, bins and indices must
    /// have equal length per device and the partition tables must hold
    /// exactly the partitions active at `current_depth`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: SubsetsSnapshot = bincode::deserialize(bytes)?;
        snapshot.check_consistency()?;
        Ok(snapshot)
    }

    fn check_consistency(&self) -> Result<()> {
        let devices = self.bins.len();
        ensure!(
            self.indices.len() == devices
                && self.partitions.len() == devices
                && self.partition_stats.len() == devices,
            SubsetsError::serialization(format!(
                "snapshot buffers span {}, {}, {} and {} devices",
                devices,
                self.indices.len(),
                self.partitions.len(),
                self.partition_stats.len()
            ))
        );
        ensure!(
            self.max_depth <= MAX_DEPTH_LIMIT
                && self.fold_bits <= MAX_FOLD_BITS
                && self.current_depth <= self.max_depth,
            SubsetsError::serialization(format!(
                "snapshot depth {} of {} with {} fold bits is out of range",
                self.current_depth, self.max_depth, self.fold_bits
            ))
        );
        let active = active_partition_count(self.current_depth, self.fold_bits);
        for dev in 0..devices {
            ensure!(
                self.bins[dev].len() == self.indices[dev].len(),
                SubsetsError::serialization(format!(
                    "device {} has {} bins but {} indices",
                    dev,
                    self.bins[dev].len(),
                    self.indices[dev].len()
                ))
            );
            ensure!(
                self.partitions[dev].len() == active && self.partition_stats[dev].len() == active,
                SubsetsError::serialization(format!(
                    "device {} holds {} partitions and {} statistics, {} are active",
                    dev,
                    self.partitions[dev].len(),
                    self.partition_stats[dev].len(),
                    active
                ))
            );
        }
        Ok(())
    }
}
