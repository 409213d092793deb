//! Stable bin-keyed reorder of a permutation.

use crate::core::constants::MAX_BIN_BITS;
use crate::core::error::{Result, SubsetsError};
use crate::core::types::{BinIndex, RowIndex};
use rayon::prelude::*;

/// Largest key width handled by one counting pass.
const MAX_REORDER_BITS: u32 = 16;

/// Stably reorder `indices` by `(bins[row] >> offset) & ((1 << bits) - 1)`.
///
/// One counting-sort pass over the `2^bits` key domain: rows with equal keys
/// keep their relative order. When `indices` is already grouped by the bits
/// below `offset`, sorting on the next `bits` bits leaves it grouped by all
/// bits up to `offset + bits`.
pub fn reorder_bins(
    bins: &[BinIndex],
    indices: &mut [RowIndex],
    offset: u32,
    bits: u32,
) -> Result<()> {
    const STAGE: &str = "reorder_bins";
    if bits == 0 {
        return Ok(());
    }
    if bits > MAX_REORDER_BITS || offset + bits > MAX_BIN_BITS + 1 {
        return Err(SubsetsError::kernel(
            STAGE,
            format!("key bits [{}, {}) out of range", offset, offset + bits),
        ));
    }

    let buckets = 1usize << bits;
    let mask = (buckets - 1) as u32;
    let keys: Vec<u32> = indices
        .par_iter()
        .map(|&row| bins.get(row as usize).map(|bin| (bin >> offset) & mask))
        .collect::<Option<Vec<u32>>>()
        .ok_or_else(|| {
            SubsetsError::kernel(
                STAGE,
                format!("permutation references a row outside {} bins", bins.len()),
            )
        })?;

    let mut starts = vec![0usize; buckets];
    for &key in &keys {
        starts[key as usize] += 1;
    }
    let mut running = 0;
    for start in starts.iter_mut() {
        let count = *start;
        *start = running;
        running += count;
    }

    let mut sorted = vec![0 as RowIndex; indices.len()];
    for (&row, &key) in indices.iter().zip(&keys) {
        let slot = &mut starts[key as usize];
        sorted[*slot] = row;
        *slot += 1;
    }
    indices.copy_from_slice(&sorted);
    Ok(())
}
