//! Sharded strategy: rows are split into contiguous per-device ranges and
//! each device derives the new bin bit from its slice of a compressed index.

use crate::compressed_index::{CFeature, CompressedIndex};
use crate::core::error::{Result, SubsetsError};
use crate::core::profiler::profiler;
use crate::core::types::{PartitionStatistics, RowIndex};
use crate::device::{run_on_devices, DeviceBuffer, DistributedObject, Mapping, StripeMapping};
use crate::kernels;
use crate::subsets::{update_subsets_stats, OptimizationSubsets, SubsetsHelper};
use crate::target::TargetSource;

/// Subsets operations for [`StripeMapping`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StripeSubsets;

impl SubsetsHelper for StripeSubsets {
    type Mapping = StripeMapping;

    fn global_partition_stats(
        subsets: &OptimizationSubsets<StripeMapping>,
    ) -> Result<Vec<PartitionStatistics>> {
        kernels::reduce_partition_stats(subsets.partition_stats.shards())
    }
}

impl StripeSubsets {
    /// Advance one level by splitting every partition on `feature` at `bin`.
    ///
    /// Row `r` of device `d` goes right when the compressed value of
    /// document `docs_for_bins[r]` is `> bin` (or `== bin` for a one-hot
    /// feature).
    pub fn split<S>(
        source: &S,
        cindex: &CompressedIndex,
        docs_for_bins: &DeviceBuffer<RowIndex, StripeMapping>,
        feature: &DistributedObject<CFeature>,
        bin: u32,
        subsets: &mut OptimizationSubsets<StripeMapping>,
    ) -> Result<()>
    where
        S: TargetSource<StripeMapping> + ?Sized,
    {
        subsets.ensure_can_split()?;
        if source.mapping() != subsets.mapping() {
            return Err(SubsetsError::dimension_mismatch(
                format!("target laid out as {:?}", subsets.mapping()),
                format!("{:?}", source.mapping()),
            ));
        }
        if docs_for_bins.mapping() != subsets.mapping() {
            return Err(SubsetsError::dimension_mismatch(
                format!("docs laid out as {:?}", subsets.mapping()),
                format!("{:?}", docs_for_bins.mapping()),
            ));
        }
        let devices = subsets.device_count();
        if cindex.mapping().device_count() != devices || feature.device_count() != devices {
            return Err(SubsetsError::dimension_mismatch(
                format!("index and feature on {} devices", devices),
                format!(
                    "index on {}, feature on {}",
                    cindex.mapping().device_count(),
                    feature.device_count()
                ),
            ));
        }

        // Every device is checked before any device writes its bins.
        let checks: Vec<_> = docs_for_bins.shards().iter().enumerate().collect();
        run_on_devices("check_compressed_docs", checks, |(dev, docs)| {
            kernels::check_compressed_docs(cindex.words(dev)?.len(), feature.get(dev)?, docs)
        })?;

        let shift = subsets.current_depth + subsets.fold_bits;
        {
            let _guard = profiler().profile("Update bins");
            let tasks: Vec<_> = subsets
                .bins
                .shards_mut()
                .iter_mut()
                .zip(docs_for_bins.shards())
                .enumerate()
                .collect();
            run_on_devices(
                "update_bin_from_compressed_index",
                tasks,
                |(dev, (bins, docs))| {
                    kernels::update_bin_from_compressed_index(
                        cindex.words(dev)?,
                        feature.get(dev)?,
                        bin,
                        docs,
                        shift,
                        bins,
                    )
                },
            )?;
        }
        {
            let _guard = profiler().profile("Reorder bins");
            subsets.reorder_on_level_bit()?;
        }

        subsets.current_depth += 1;
        log::debug!(
            "Stripe split on feature {} at bin {} to depth {}",
            feature.get(0).map_or(0, |f| f.index),
            bin,
            subsets.current_depth
        );
        update_subsets_stats(source, subsets)
    }
}
