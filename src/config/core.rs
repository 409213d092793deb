//! Core configuration structure and builder for the subsets engine.

use crate::config::device::DeviceConfig;
use crate::core::constants::*;
use crate::core::error::{Result, SubsetsError};
use crate::core::profiler::profiler;
use crate::core::types::{fold_bits, DistributionType};
use crate::device::{MirrorMapping, StripeMapping};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Configuration of one subsets engine instance.
///
/// Serialized as JSON or TOML; missing fields take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetsConfig {
    /// Maximum tree depth; sizes the partition table
    pub max_depth: u32,
    /// Number of ordered-boosting folds (1 = no fold dimension)
    pub fold_count: u32,
    /// Record named-scope timings in the global profiler
    pub enable_profiling: bool,
    /// Device layout
    pub device: DeviceConfig,
}

impl Default for SubsetsConfig {
    fn default() -> Self {
        SubsetsConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            fold_count: DEFAULT_FOLD_COUNT,
            enable_profiling: false,
            device: DeviceConfig::default(),
        }
    }
}

impl SubsetsConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH_LIMIT {
            return Err(SubsetsError::invalid_parameter(
                "max_depth",
                self.max_depth.to_string(),
                format!("must be in [1, {}]", MAX_DEPTH_LIMIT),
            ));
        }
        if self.fold_count == 0 {
            return Err(SubsetsError::invalid_parameter(
                "fold_count",
                self.fold_count.to_string(),
                "must be at least 1",
            ));
        }
        let fold_bits = fold_bits(self.fold_count);
        if fold_bits > MAX_FOLD_BITS || self.max_depth + fold_bits > MAX_BIN_BITS {
            return Err(SubsetsError::invalid_parameter(
                "fold_count",
                self.fold_count.to_string(),
                format!(
                    "needs {} fold bits, at most {} supported with max_depth {}",
                    fold_bits, MAX_FOLD_BITS, self.max_depth
                ),
            ));
        }
        self.device.validate()
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubsetsError::config(format!("Failed to read config file: {}", e)))?;

        let config: SubsetsConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(SubsetsError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)
                .map_err(|e| SubsetsError::config(format!("Failed to serialize to TOML: {}", e)))?,
            _ => {
                return Err(SubsetsError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from `SUBSETS_*` environment variables
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        if let Some(max_depth) = env_override("MAX_DEPTH")? {
            self.max_depth = max_depth;
        }
        if let Some(fold_count) = env_override("FOLD_COUNT")? {
            self.fold_count = fold_count;
        }
        if let Some(num_devices) = env_override("NUM_DEVICES")? {
            self.device.num_devices = num_devices;
        }
        if let Some(num_threads) = env_override("NUM_THREADS")? {
            self.device.num_threads = num_threads;
        }
        if let Ok(val) = std::env::var(format!("{}DISTRIBUTION", ENV_PREFIX)) {
            self.device.distribution = match val.as_str() {
                "mirror" => DistributionType::Mirror,
                "stripe" => DistributionType::Stripe,
                _ => {
                    return Err(SubsetsError::config(format!(
                        "Invalid {}DISTRIBUTION: {}",
                        ENV_PREFIX, val
                    )))
                }
            };
        }

        self.validate()
    }

    /// Get effective number of threads
    pub fn effective_num_threads(&self) -> usize {
        self.device.effective_num_threads()
    }

    /// Mirrored layout of `rows` rows over the configured devices.
    pub fn mirror_mapping(&self, rows: usize) -> MirrorMapping {
        MirrorMapping::new(rows, self.device.num_devices)
    }

    /// Row-sharded layout of `rows` rows over the configured devices.
    pub fn stripe_mapping(&self, rows: usize) -> StripeMapping {
        StripeMapping::split_to_devices(rows, self.device.num_devices)
    }

    /// Worker pool sized by [`SubsetsConfig::effective_num_threads`].
    pub fn build_thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.effective_num_threads())
            .build()
            .map_err(|e| SubsetsError::config(format!("Failed to build thread pool: {}", e)))
    }

    /// Switch the global profiler on or off to match this configuration.
    pub fn apply_profiling(&self) {
        profiler().set_enabled(self.enable_profiling);
    }
}

fn env_override<T: FromStr>(name: &str) -> Result<Option<T>> {
    let key = format!("{}{}", ENV_PREFIX, name);
    match std::env::var(&key) {
        Ok(val) => val
            .parse()
            .map(Some)
            .map_err(|_| SubsetsError::config(format!("Invalid {}: {}", key, val))),
        Err(_) => Ok(None),
    }
}

/// Builder for [`SubsetsConfig`]
#[derive(Debug, Default)]
pub struct SubsetsConfigBuilder {
    config: SubsetsConfig,
}

impl SubsetsConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum tree depth
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set number of folds
    pub fn fold_count(mut self, fold_count: u32) -> Self {
        self.config.fold_count = fold_count;
        self
    }

    /// Set number of devices
    pub fn num_devices(mut self, num_devices: usize) -> Self {
        self.config.device.num_devices = num_devices;
        self
    }

    /// Set distribution strategy
    pub fn distribution(mut self, distribution: DistributionType) -> Self {
        self.config.device.distribution = distribution;
        self
    }

    /// Set number of threads
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.config.device.num_threads = num_threads;
        self
    }

    /// Enable or disable profiling
    pub fn enable_profiling(mut self, enabled: bool) -> Self {
        self.config.enable_profiling = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SubsetsConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
