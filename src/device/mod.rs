//! Device layer: distribution descriptors, per-device buffers and the stage
//! runner that dispatches one primitive to every device.
//!
//! Devices are host-resident shards. A stage runs its per-device work on the
//! rayon pool and returns only after every device has finished, which is the
//! barrier between consecutive stages of a split or a stats refresh.

pub mod buffer;
pub mod mapping;

pub use buffer::DeviceBuffer;
pub use mapping::{Mapping, MirrorMapping, StripeMapping, SubsetsMapping};

use crate::core::error::{Result, SubsetsError};
use crate::core::types::DeviceId;
use rayon::prelude::*;

/// Run `stage` once per device task in parallel.
///
/// Each task carries its own device-local borrows. If any device fails, one
/// of the failing devices' errors is returned after all tasks stopped.
pub fn run_on_devices<I, F>(stage: &str, tasks: Vec<I>, f: F) -> Result<()>
where
    I: Send,
    F: Fn(I) -> Result<()> + Sync + Send,
{
    log::trace!("{}: dispatching to {} devices", stage, tasks.len());
    tasks.into_par_iter().try_for_each(f)
}

/// One value per device, e.g. a feature descriptor whose layout differs
/// between device shards.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedObject<T> {
    values: Vec<T>,
}

impl<T: Clone> DistributedObject<T> {
    /// Build from per-device values.
    pub fn new(values: Vec<T>) -> Self {
        DistributedObject { values }
    }

    /// The same value on `num_devices` devices.
    pub fn repeat(value: T, num_devices: usize) -> Self {
        DistributedObject {
            values: vec![value; num_devices],
        }
    }

    /// Value for `dev`.
    pub fn get(&self, dev: DeviceId) -> Result<&T> {
        self.values
            .get(dev)
            .ok_or_else(|| SubsetsError::invalid_device(dev, self.values.len()))
    }

    /// Number of devices.
    pub fn device_count(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_run_on_devices_visits_every_task() {
        let visited = AtomicUsize::new(0);
        let tasks: Vec<usize> = (0..4).collect();
        run_on_devices("count", tasks, |_| {
            visited.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
        assert_eq!(visited.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_run_on_devices_mutates_disjoint_shards() {
        let mut buffer: DeviceBuffer<u32, _> = DeviceBuffer::new(StripeMapping::split_to_devices(6, 3));
        let tasks: Vec<_> = buffer.shards_mut().iter_mut().enumerate().collect();
        run_on_devices("fill", tasks, |(dev, shard)| {
            shard.fill(dev as u32);
            Ok(())
        })
        .unwrap();
        assert_eq!(buffer.to_host(), vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_run_on_devices_propagates_failure() {
        let result = run_on_devices("fail", vec![0usize, 1, 2], |dev| {
            if dev == 1 {
                Err(SubsetsError::kernel("fail", "device fault"))
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(SubsetsError::Kernel { .. })));
    }

    #[test]
    fn test_distributed_object() {
        let object = DistributedObject::repeat(3u32, 2);
        assert_eq!(object.device_count(), 2);
        assert_eq!(*object.get(1).unwrap(), 3);
        assert!(object.get(2).is_err());
    }
}
