//! Partition boundary derivation and per-partition reduction.

use crate::core::error::{Result, SubsetsError};
use crate::core::types::{BinIndex, DataPartition, Hist, Label, PartitionStatistics, RowIndex};
use rayon::prelude::*;

/// Derive `{offset, size}` for every partition in `parts` from the bins of
/// the permuted rows.
///
/// `parts.len()` is the active partition count. The permutation must be
/// sorted by bin and every bin must be below the active count. Empty
/// partitions get size 0 at the position where their run would start.
pub fn update_partition_dimensions(
    bins: &[BinIndex],
    indices: &[RowIndex],
    parts: &mut [DataPartition],
) -> Result<()> {
    const STAGE: &str = "update_partition_dimensions";
    parts.fill(DataPartition::default());

    let mut previous = 0;
    for (position, &row) in indices.iter().enumerate() {
        let bin = *bins.get(row as usize).ok_or_else(|| {
            SubsetsError::kernel(STAGE, format!("row {} outside {} bins", row, bins.len()))
        })?;
        if bin as usize >= parts.len() {
            return Err(SubsetsError::kernel(
                STAGE,
                format!(
                    "row {} has bin {} outside {} active partitions",
                    row,
                    bin,
                    parts.len()
                ),
            ));
        }
        if bin < previous {
            return Err(SubsetsError::kernel(
                STAGE,
                format!("permutation not sorted by bin at position {}", position),
            ));
        }
        parts[bin as usize].size += 1;
        previous = bin;
    }

    let mut offset = 0;
    for part in parts.iter_mut() {
        part.offset = offset;
        offset += part.size;
    }
    Ok(())
}

/// Sum the gathered values of every partition into `stats`.
///
/// Rows inside one partition are summed in permuted order, so repeated runs
/// over the same input are bit-identical.
pub fn update_partition_stats(
    stats: &mut [PartitionStatistics],
    parts: &[DataPartition],
    weighted_target: &[Label],
    weights: &[Label],
) -> Result<()> {
    const STAGE: &str = "update_partition_stats";
    if stats.len() != parts.len() {
        return Err(SubsetsError::kernel(
            STAGE,
            format!("{} statistics entries for {} partitions", stats.len(), parts.len()),
        ));
    }
    if weighted_target.len() != weights.len() {
        return Err(SubsetsError::kernel(
            STAGE,
            format!(
                "{} weighted targets but {} weights",
                weighted_target.len(),
                weights.len()
            ),
        ));
    }
    if let Some(part) = parts.iter().find(|p| p.end() as usize > weights.len()) {
        return Err(SubsetsError::kernel(
            STAGE,
            format!("partition {} exceeds {} gathered rows", part, weights.len()),
        ));
    }

    stats
        .par_iter_mut()
        .zip(parts.par_iter())
        .for_each(|(stat, part)| {
            let range = part.range();
            let mut sum: Hist = 0.0;
            let mut weight: Hist = 0.0;
            for (&wt, &w) in weighted_target[range.clone()].iter().zip(&weights[range]) {
                sum += Hist::from(wt);
                weight += Hist::from(w);
            }
            *stat = PartitionStatistics::new(sum, weight, u64::from(part.size));
        });
    Ok(())
}

/// Element-wise total of per-device statistics tables.
pub fn reduce_partition_stats(shards: &[Vec<PartitionStatistics>]) -> Result<Vec<PartitionStatistics>> {
    let Some(first) = shards.first() else {
        return Ok(Vec::new());
    };
    let mut total = vec![PartitionStatistics::default(); first.len()];
    for (dev, shard) in shards.iter().enumerate() {
        if shard.len() != total.len() {
            return Err(SubsetsError::dimension_mismatch(
                format!("{} statistics entries", total.len()),
                format!("{} on device {}", shard.len(), dev),
            ));
        }
        for (acc, stat) in total.iter_mut().zip(shard) {
            *acc += *stat;
        }
    }
    Ok(total)
}
