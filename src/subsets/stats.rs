//! Stats refresh: partition boundaries, gathered targets and per-partition
//! sums recomputed from the current bins and permutation.

use crate::core::error::{Result, SubsetsError};
use crate::device::{run_on_devices, SubsetsMapping};
use crate::kernels;
use crate::subsets::{OptimizationSubsets, SubsetsViewMut};
use crate::target::TargetSource;

/// Recompute the partition table, the permuted target values and the
/// partition statistics of `subsets` from `source`.
///
/// Runs three device-wide stages. Each one finishes on every device before
/// the next starts, so statistics are never computed from stale partitions.
pub fn update_subsets_stats<M, S>(source: &S, subsets: &mut OptimizationSubsets<M>) -> Result<()>
where
    M: SubsetsMapping,
    S: TargetSource<M> + ?Sized,
{
    let rows = source.mapping();
    if rows != subsets.bins.mapping() {
        return Err(SubsetsError::dimension_mismatch(
            format!("rows laid out as {:?}", subsets.bins.mapping()),
            format!("target laid out as {:?}", rows),
        ));
    }
    let active = subsets.active_partition_count();
    if active > subsets.partition_capacity() {
        return Err(SubsetsError::depth_exceeded(
            subsets.current_depth,
            subsets.max_depth,
        ));
    }

    subsets.partition_stats.reset(rows.partition_table(active));
    if subsets.weighted_target.mapping() != rows {
        subsets.weighted_target.reset(rows.clone());
        subsets.weights.reset(rows.clone());
    }

    log::debug!(
        "Refreshing {} partitions at depth {} on {} devices",
        active,
        subsets.current_depth,
        subsets.device_count()
    );

    run_on_devices(
        "update_partition_dimensions",
        subsets.device_views_mut(),
        |view| {
            let active = view.active_partition_count();
            let SubsetsViewMut {
                bins,
                indices,
                partitions,
                ..
            } = view;
            kernels::update_partition_dimensions(bins, indices, &mut partitions[..active])
        },
    )?;

    run_on_devices("gather_target", subsets.device_views_mut(), |view| {
        kernels::gather_target(
            view.weighted_target,
            view.weights,
            source.weighted_target(view.device)?,
            source.weights(view.device)?,
            view.indices,
        )
    })?;

    run_on_devices("update_partition_stats", subsets.device_views_mut(), |view| {
        let active = view.active_partition_count();
        kernels::update_partition_stats(
            view.partition_stats,
            &view.partitions[..active],
            view.weighted_target,
            view.weights,
        )
    })
}
