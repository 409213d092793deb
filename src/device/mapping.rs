//! Distribution descriptors: how the logical entries of a buffer are laid out
//! over the compute devices.

use crate::core::error::{Result, SubsetsError};
use crate::core::types::{DeviceId, DistributionType};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::Range;

/// Layout of a logical buffer over devices.
pub trait Mapping: Clone + Debug + PartialEq + Send + Sync {
    /// Number of devices the buffer lives on.
    fn device_count(&self) -> usize;

    /// Number of entries stored on `dev`. Zero for an unknown device.
    fn device_size(&self, dev: DeviceId) -> usize;

    /// Number of logical entries.
    fn total_size(&self) -> usize;

    /// Split a host buffer into per-device shards following this layout.
    fn scatter<T: Clone>(&self, host: &[T]) -> Result<Vec<Vec<T>>>;

    /// Assemble per-device shards back into one host buffer.
    fn gather<T: Clone>(&self, shards: &[Vec<T>]) -> Vec<T>;

    /// Fail unless `dev` is one of this layout's devices.
    fn check_device(&self, dev: DeviceId) -> Result<()> {
        if dev < self.device_count() {
            Ok(())
        } else {
            Err(SubsetsError::invalid_device(dev, self.device_count()))
        }
    }
}

/// A row layout the subsets engine can be built on.
pub trait SubsetsMapping: Mapping {
    /// Distribution strategy this layout implements.
    const DISTRIBUTION: DistributionType;

    /// Layout of a `count`-entry table stored identically on every device.
    fn partition_table(&self, count: usize) -> Self;
}

/// Every device holds a full replica of `size` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorMapping {
    size: usize,
    num_devices: usize,
}

impl MirrorMapping {
    /// Replicate `size` entries on `num_devices` devices.
    pub fn new(size: usize, num_devices: usize) -> Self {
        MirrorMapping { size, num_devices }
    }

    /// Entries per replica.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Mapping for MirrorMapping {
    fn device_count(&self) -> usize {
        self.num_devices
    }

    fn device_size(&self, dev: DeviceId) -> usize {
        if dev < self.num_devices {
            self.size
        } else {
            0
        }
    }

    fn total_size(&self) -> usize {
        self.size
    }

    fn scatter<T: Clone>(&self, host: &[T]) -> Result<Vec<Vec<T>>> {
        if host.len() != self.size {
            return Err(SubsetsError::dimension_mismatch(
                format!("{} entries", self.size),
                format!("{} entries", host.len()),
            ));
        }
        Ok((0..self.num_devices).map(|_| host.to_vec()).collect())
    }

    fn gather<T: Clone>(&self, shards: &[Vec<T>]) -> Vec<T> {
        shards.first().cloned().unwrap_or_default()
    }
}

impl SubsetsMapping for MirrorMapping {
    const DISTRIBUTION: DistributionType = DistributionType::Mirror;

    fn partition_table(&self, count: usize) -> Self {
        MirrorMapping::new(count, self.num_devices)
    }
}

/// Entries are split into contiguous ranges, one per device.
///
/// `offsets` has one entry per device plus a terminating total, so device
/// `d` owns logical entries `offsets[d]..offsets[d + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeMapping {
    offsets: Vec<usize>,
}

impl StripeMapping {
    /// Build a layout from explicit per-device sizes.
    pub fn from_sizes(sizes: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        let mut total = 0;
        offsets.push(0);
        for &size in sizes {
            total += size;
            offsets.push(total);
        }
        StripeMapping { offsets }
    }

    /// Split `size` entries as evenly as possible; the first `size % n`
    /// devices get one extra entry.
    pub fn split_to_devices(size: usize, num_devices: usize) -> Self {
        let num_devices = num_devices.max(1);
        let base = size / num_devices;
        let remainder = size % num_devices;
        let sizes: Vec<usize> = (0..num_devices)
            .map(|dev| base + usize::from(dev < remainder))
            .collect();
        Self::from_sizes(&sizes)
    }

    /// Every device stores its own copy of a `count`-entry table.
    pub fn repeat_on_all_devices(count: usize, num_devices: usize) -> Self {
        Self::from_sizes(&vec![count; num_devices])
    }

    /// Logical entries owned by `dev`.
    pub fn device_range(&self, dev: DeviceId) -> Range<usize> {
        if dev + 1 < self.offsets.len() {
            self.offsets[dev]..self.offsets[dev + 1]
        } else {
            0..0
        }
    }
}

impl Mapping for StripeMapping {
    fn device_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    fn device_size(&self, dev: DeviceId) -> usize {
        self.device_range(dev).len()
    }

    fn total_size(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    fn scatter<T: Clone>(&self, host: &[T]) -> Result<Vec<Vec<T>>> {
        if host.len() != self.total_size() {
            return Err(SubsetsError::dimension_mismatch(
                format!("{} entries", self.total_size()),
                format!("{} entries", host.len()),
            ));
        }
        Ok((0..self.device_count())
            .map(|dev| host[self.device_range(dev)].to_vec())
            .collect())
    }

    fn gather<T: Clone>(&self, shards: &[Vec<T>]) -> Vec<T> {
        shards.iter().flat_map(|shard| shard.iter().cloned()).collect()
    }
}

impl SubsetsMapping for StripeMapping {
    const DISTRIBUTION: DistributionType = DistributionType::Stripe;

    fn partition_table(&self, count: usize) -> Self {
        StripeMapping::repeat_on_all_devices(count, self.device_count())
    }
}
