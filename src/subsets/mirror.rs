//! Mirrored strategy: every device holds all rows and performs the same
//! split, so all replicas stay identical.

use crate::core::error::{Result, SubsetsError};
use crate::core::profiler::profiler;
use crate::core::types::{BinIndex, PartitionStatistics, RowIndex};
use crate::device::{run_on_devices, DeviceBuffer, MirrorMapping};
use crate::kernels;
use crate::subsets::{update_subsets_stats, OptimizationSubsets, SubsetsHelper};
use crate::target::TargetSource;

/// Subsets operations for [`MirrorMapping`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MirrorSubsets;

impl SubsetsHelper for MirrorSubsets {
    type Mapping = MirrorMapping;

    fn global_partition_stats(
        subsets: &OptimizationSubsets<MirrorMapping>,
    ) -> Result<Vec<PartitionStatistics>> {
        Ok(subsets.partition_stats.device_view(0)?.to_vec())
    }
}

impl MirrorSubsets {
    /// Advance one level using the leaf assignment of the tree being grown.
    ///
    /// `next_level_doc_bins[doc]` is the leaf of source document `doc` after
    /// this level; bit `current_depth` of it is the new direction. Row `r`
    /// of the subsets is document `doc_map[r]`.
    pub fn split<S>(
        source: &S,
        next_level_doc_bins: &DeviceBuffer<BinIndex, MirrorMapping>,
        doc_map: &DeviceBuffer<RowIndex, MirrorMapping>,
        subsets: &mut OptimizationSubsets<MirrorMapping>,
    ) -> Result<()>
    where
        S: TargetSource<MirrorMapping> + ?Sized,
    {
        subsets.ensure_can_split()?;
        if source.mapping() != subsets.mapping() {
            return Err(SubsetsError::dimension_mismatch(
                format!("target laid out as {:?}", subsets.mapping()),
                format!("{:?}", source.mapping()),
            ));
        }
        if doc_map.mapping() != subsets.mapping() {
            return Err(SubsetsError::dimension_mismatch(
                format!("doc map laid out as {:?}", subsets.mapping()),
                format!("{:?}", doc_map.mapping()),
            ));
        }
        if next_level_doc_bins.device_count() != subsets.device_count() {
            return Err(SubsetsError::dimension_mismatch(
                format!("next-level bins on {} devices", subsets.device_count()),
                format!("{} devices", next_level_doc_bins.device_count()),
            ));
        }

        // Every device is checked before any device writes its bins.
        let checks: Vec<_> = next_level_doc_bins.shards().iter().zip(doc_map.shards()).collect();
        run_on_devices("check_doc_map", checks, |(next_level, map)| {
            kernels::check_doc_map(next_level.len(), map)
        })?;

        let depth = subsets.current_depth;
        let fold_bits = subsets.fold_bits;
        {
            let _guard = profiler().profile("Update bins");
            let tasks: Vec<_> = subsets
                .bins
                .shards_mut()
                .iter_mut()
                .zip(next_level_doc_bins.shards())
                .zip(doc_map.shards())
                .collect();
            run_on_devices("update_bins", tasks, |((bins, next_level), map)| {
                kernels::update_bins(bins, next_level, map, depth, fold_bits)
            })?;
        }
        {
            let _guard = profiler().profile("Reorder bins");
            subsets.reorder_on_level_bit()?;
        }

        subsets.current_depth += 1;
        log::debug!("Mirror split to depth {}", subsets.current_depth);
        update_subsets_stats(source, subsets)
    }
}
