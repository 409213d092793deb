//! Configuration management for the subsets engine.
//!
//! A [`SubsetsConfig`] fixes the maximum depth, the fold count and the
//! device layout. It can be built programmatically, loaded from JSON or
//! TOML files, and overridden from `SUBSETS_*` environment variables.

pub mod core;
pub mod device;

pub use self::core::{SubsetsConfig, SubsetsConfigBuilder};
pub use self::device::DeviceConfig;
