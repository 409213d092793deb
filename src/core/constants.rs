//! System constants and configuration defaults for the subsets engine.

/// Library version string.
pub const OBLIVIOUS_SUBSETS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest supported tree depth.
pub const MAX_DEPTH_LIMIT: u32 = 16;

/// Largest number of bin bits (depth plus fold bits) a `u32` bin can carry
/// while `1 << bits` still fits the partition table indexing.
pub const MAX_BIN_BITS: u32 = 31;

/// Largest number of fold bits; keeps the partition table within
/// `2^(MAX_DEPTH_LIMIT + MAX_FOLD_BITS)` entries.
pub const MAX_FOLD_BITS: u32 = 8;

/// Default maximum tree depth.
pub const DEFAULT_MAX_DEPTH: u32 = 6;

/// Default number of ordered-boosting folds (1 = no fold dimension).
pub const DEFAULT_FOLD_COUNT: u32 = 1;

/// Default number of compute devices.
pub const DEFAULT_NUM_DEVICES: usize = 1;

/// Default number of threads (0 = use all available cores).
pub const DEFAULT_NUM_THREADS: usize = 0;

/// Shards smaller than this are processed without splitting work into rayon
/// tasks.
pub const PARALLEL_ROW_THRESHOLD: usize = 1024;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "SUBSETS_";
