//! Device configuration: how many devices, how rows are distributed over
//! them and how large the worker pool is.

use crate::core::constants::*;
use crate::core::error::{Result, SubsetsError};
use crate::core::types::DistributionType;
use serde::{Deserialize, Serialize};

/// Device configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Number of compute devices (shards)
    pub num_devices: usize,
    /// Row distribution strategy
    pub distribution: DistributionType,
    /// Worker threads (0 = all available cores)
    pub num_threads: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            num_devices: DEFAULT_NUM_DEVICES,
            distribution: DistributionType::default(),
            num_threads: DEFAULT_NUM_THREADS,
        }
    }
}

impl DeviceConfig {
    /// Create a new device configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrored layout on `num_devices` devices.
    pub fn mirror(num_devices: usize) -> Self {
        DeviceConfig {
            num_devices,
            distribution: DistributionType::Mirror,
            ..Self::default()
        }
    }

    /// Row-sharded layout on `num_devices` devices.
    pub fn stripe(num_devices: usize) -> Self {
        DeviceConfig {
            num_devices,
            distribution: DistributionType::Stripe,
            ..Self::default()
        }
    }

    /// Set number of threads
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Validate device configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_devices == 0 {
            return Err(SubsetsError::invalid_parameter(
                "num_devices",
                self.num_devices.to_string(),
                "must be at least 1",
            ));
        }

        let cores = num_cpus::get();
        if self.num_threads > cores * 2 {
            log::warn!(
                "num_threads ({}) is much larger than the available cores ({})",
                self.num_threads,
                cores
            );
        }
        Ok(())
    }

    /// Get effective number of threads
    pub fn effective_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }
}
