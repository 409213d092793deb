//! Row/bin primitives with fixed per-device contracts.
//!
//! Every function operates on one device's shard. Dispatch over devices and
//! the barrier between stages belong to the caller (see
//! [`crate::device::run_on_devices`]).

pub mod bins;
pub mod gather;
pub mod partitions;
pub mod reorder;

pub use bins::{
    check_compressed_docs, check_doc_map, fill_buffer, make_sequence, update_bin_from_compressed_index,
    update_bins,
};
pub use gather::gather_target;
pub use partitions::{reduce_partition_stats, update_partition_dimensions, update_partition_stats};
pub use reorder::reorder_bins;
