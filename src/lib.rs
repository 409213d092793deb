//! # Oblivious Subsets
//!
//! Multi-device row partitioning for level-wise (oblivious) decision tree
//! growth. At every tree level all leaves split at once; this crate keeps,
//! for every row, the leaf it currently falls into, a permutation grouping
//! rows by leaf, the `{offset, size}` run of every leaf within that
//! permutation, and per-leaf sums of weight and weighted target.
//!
//! ## Features
//!
//! - **Two distribution strategies**: a mirrored layout where every device
//!   holds all rows, and a sharded layout where rows are split into
//!   contiguous per-device ranges while the partition table is replicated.
//! - **Stable reorders**: one counting-sort pass per level keeps the
//!   permutation grouped by leaf and makes repeated runs bit-identical.
//! - **Fold support**: ordered-boosting folds occupy the low bin bits.
//! - **Parallel stages**: every stage runs on all devices concurrently using
//!   Rayon and completes before the next stage starts.
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::Array1;
//! use oblivious_subsets::{
//!     DeviceBuffer, L2Target, MirrorMapping, MirrorSubsets, SubsetsHelper,
//! };
//!
//! # fn main() -> oblivious_subsets::Result<()> {
//! let mapping = MirrorMapping::new(8, 2);
//! let targets = Array1::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
//! let source = L2Target::from_arrays(targets.view(), None, mapping.clone())?;
//!
//! let mut subsets = MirrorSubsets::create_subsets(1, &source)?;
//!
//! // Odd rows go right.
//! let next_level = DeviceBuffer::from_host(&[0, 1, 0, 1, 0, 1, 0, 1], mapping.clone())?;
//! let doc_map = DeviceBuffer::sequence(mapping);
//! MirrorSubsets::split(&source, &next_level, &doc_map, &mut subsets)?;
//!
//! let stats = MirrorSubsets::global_partition_stats(&subsets)?;
//! assert_eq!(stats[0].weighted_target, 16.0);
//! assert_eq!(stats[1].weighted_target, 20.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: error type, index aliases, partition records, profiler
//! - [`config`]: engine configuration (depth, folds, device layout)
//! - [`device`]: distribution descriptors, device buffers, stage runner
//! - [`kernels`]: per-device row/bin primitives
//! - [`target`]: per-row target sources
//! - [`compressed_index`]: packed feature columns for the sharded split
//! - [`subsets`]: the partition state and its split/refresh operations

#![doc(html_root_url = "https://docs.rs/oblivious-subsets/")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Device layouts and buffers
pub mod device;

// Row/bin primitives
pub mod kernels;

// Target sources
pub mod target;

// Compressed feature index
pub mod compressed_index;

// Partition state
pub mod subsets;

// Re-export core functionality for convenience
pub use crate::core::{
    constants::*,
    error::{Result, SubsetsError},
    profiler::{profiler, Profiler},
    types::*,
};

// Re-export configuration functionality
pub use config::{DeviceConfig, SubsetsConfig, SubsetsConfigBuilder};

// Re-export device functionality
pub use device::{
    run_on_devices, DeviceBuffer, DistributedObject, Mapping, MirrorMapping, StripeMapping,
    SubsetsMapping,
};

pub use compressed_index::{CFeature, CompressedIndex, CompressedIndexBuilder};
pub use subsets::{
    update_subsets_stats, MirrorSubsets, OptimizationSubsets, PartitionsView, StripeSubsets,
    SubsetsHelper, SubsetsSnapshot, SubsetsView,
};
pub use target::{L2Target, TargetSource};

// Version information
pub use crate::core::constants::OBLIVIOUS_SUBSETS_VERSION as VERSION;

/// Initialize the library.
///
/// Installs the `env_logger` backend (defaulting to `RUST_LOG=info`). Calling
/// it more than once is harmless.
///
/// # Examples
///
/// ```rust
/// fn main() -> oblivious_subsets::Result<()> {
///     oblivious_subsets::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    crate::core::initialize_core()
}

/// Check if the library has been initialized.
pub fn is_initialized() -> bool {
    crate::core::is_core_initialized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_initialization() {
        assert!(init().is_ok());
        assert!(is_initialized());
    }

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_config_builder() {
        let config = SubsetsConfigBuilder::new()
            .max_depth(5)
            .num_devices(2)
            .distribution(DistributionType::Stripe)
            .build()
            .unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.device.distribution, DistributionType::Stripe);
    }
}
