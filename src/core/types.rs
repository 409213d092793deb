//! Core data types for the subsets engine.
//!
//! The partition descriptor and partition statistics records are laid out
//! exactly as the device kernels read them, so both are `#[repr(C)]` and their
//! sizes are pinned at compile time.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;
use std::fmt;
use std::ops::{Add, AddAssign};

/// Row identity type. A permutation is a sequence of row indices.
pub type RowIndex = u32;

/// Partition id type. Low `fold_bits` bits hold the fold, the rest the leaf.
pub type BinIndex = u32;

/// Compute device identifier.
pub type DeviceId = usize;

/// Per-row target and weight value type.
pub type Label = f32;

/// Accumulator type for partition sums.
pub type Hist = f64;

/// One contiguous run of the permuted row order.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataPartition {
    /// First permuted position of the run
    pub offset: u32,
    /// Number of rows in the run
    pub size: u32,
}

impl DataPartition {
    /// Create a new partition descriptor.
    pub fn new(offset: u32, size: u32) -> Self {
        DataPartition { offset, size }
    }

    /// One past the last permuted position of the run.
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }

    /// Whether the run is empty.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Permuted positions covered by the run.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset as usize..self.end() as usize
    }
}

impl fmt::Display for DataPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.end())
    }
}

/// Aggregated sums over the rows of one partition.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionStatistics {
    /// Sum of weight * target
    pub weighted_target: Hist,
    /// Sum of weight
    pub weight: Hist,
    /// Number of rows
    pub count: u64,
}

impl PartitionStatistics {
    /// Create a statistics record.
    pub fn new(weighted_target: Hist, weight: Hist, count: u64) -> Self {
        PartitionStatistics {
            weighted_target,
            weight,
            count,
        }
    }
}

impl Add for PartitionStatistics {
    type Output = PartitionStatistics;

    fn add(self, rhs: PartitionStatistics) -> PartitionStatistics {
        PartitionStatistics {
            weighted_target: self.weighted_target + rhs.weighted_target,
            weight: self.weight + rhs.weight,
            count: self.count + rhs.count,
        }
    }
}

impl AddAssign for PartitionStatistics {
    fn add_assign(&mut self, rhs: PartitionStatistics) {
        *self = *self + rhs;
    }
}

/// Data distribution strategy across devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionType {
    /// Every device holds all rows
    Mirror,
    /// Rows are split into contiguous per-device ranges
    Stripe,
}

impl Default for DistributionType {
    fn default() -> Self {
        DistributionType::Mirror
    }
}

impl fmt::Display for DistributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionType::Mirror => write!(f, "mirror"),
            DistributionType::Stripe => write!(f, "stripe"),
        }
    }
}

/// Number of low-order bin bits reserved for `fold_count` folds.
pub fn fold_bits(fold_count: u32) -> u32 {
    if fold_count <= 1 {
        0
    } else {
        32 - (fold_count - 1).leading_zeros()
    }
}

/// Number of active partitions for the given depth and fold bits.
pub fn active_partition_count(depth: u32, fold_bits: u32) -> usize {
    1usize << (depth + fold_bits)
}

const_assert_eq!(std::mem::size_of::<DataPartition>(), 8);
const_assert_eq!(std::mem::size_of::<PartitionStatistics>(), 24);
