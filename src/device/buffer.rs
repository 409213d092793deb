//! Owned multi-device buffers.
//!
//! A [`DeviceBuffer`] keeps one host-resident shard per device. Shard `d`
//! always holds exactly `mapping.device_size(d)` entries.

use crate::core::error::{Result, SubsetsError};
use crate::core::types::{DeviceId, RowIndex};
use crate::device::mapping::{Mapping, StripeMapping};

/// One shard per device, laid out according to `M`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceBuffer<T, M: Mapping> {
    mapping: M,
    shards: Vec<Vec<T>>,
}

impl<T, M> DeviceBuffer<T, M>
where
    T: Clone + Default + Send + Sync,
    M: Mapping,
{
    /// Allocate a default-initialized buffer.
    pub fn new(mapping: M) -> Self {
        let shards = (0..mapping.device_count())
            .map(|dev| vec![T::default(); mapping.device_size(dev)])
            .collect();
        DeviceBuffer { mapping, shards }
    }

    /// Distribute a host buffer over devices.
    pub fn from_host(host: &[T], mapping: M) -> Result<Self> {
        let shards = mapping.scatter(host)?;
        Ok(DeviceBuffer { mapping, shards })
    }

    /// Re-layout the buffer; all entries are reset to their default value.
    pub fn reset(&mut self, mapping: M) {
        self.shards.resize_with(mapping.device_count(), Vec::new);
        for (dev, shard) in self.shards.iter_mut().enumerate() {
            shard.clear();
            shard.resize(mapping.device_size(dev), T::default());
        }
        self.mapping = mapping;
    }

    /// Set every entry on every device.
    pub fn fill(&mut self, value: T) {
        for shard in &mut self.shards {
            shard.fill(value.clone());
        }
    }

    /// Copy back to one host buffer following the layout.
    pub fn to_host(&self) -> Vec<T> {
        self.mapping.gather(&self.shards)
    }
}

impl<T, M: Mapping> DeviceBuffer<T, M> {
    /// Layout of this buffer.
    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    /// Number of devices.
    pub fn device_count(&self) -> usize {
        self.shards.len()
    }

    /// Read-only shard of `dev`.
    pub fn device_view(&self, dev: DeviceId) -> Result<&[T]> {
        self.mapping.check_device(dev)?;
        Ok(&self.shards[dev])
    }

    /// All shards in device order.
    pub fn shards(&self) -> &[Vec<T>] {
        &self.shards
    }

    pub(crate) fn shards_mut(&mut self) -> &mut [Vec<T>] {
        &mut self.shards
    }
}

impl<T> DeviceBuffer<T, StripeMapping> {
    /// Adopt already-sharded data; every shard must match the layout.
    ///
    /// Only striped layouts can be adopted shard by shard. Mirrored buffers
    /// are built with [`DeviceBuffer::from_host`] so their replicas are equal.
    pub fn from_shards(shards: Vec<Vec<T>>, mapping: StripeMapping) -> Result<Self> {
        if shards.len() != mapping.device_count() {
            return Err(SubsetsError::dimension_mismatch(
                format!("{} shards", mapping.device_count()),
                format!("{} shards", shards.len()),
            ));
        }
        for (dev, shard) in shards.iter().enumerate() {
            if shard.len() != mapping.device_size(dev) {
                return Err(SubsetsError::dimension_mismatch(
                    format!("device {} size {}", dev, mapping.device_size(dev)),
                    format!("device {} size {}", dev, shard.len()),
                ));
            }
        }
        Ok(DeviceBuffer { mapping, shards })
    }
}

impl<M: Mapping> DeviceBuffer<RowIndex, M> {
    /// Buffer whose every shard holds `0..device_size`.
    pub fn sequence(mapping: M) -> Self {
        let mut buffer = DeviceBuffer::new(mapping);
        for shard in buffer.shards_mut() {
            crate::kernels::make_sequence(shard);
        }
        buffer
    }
}
