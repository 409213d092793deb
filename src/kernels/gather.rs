//! Gather of per-row target values into permuted order.

use crate::core::constants::PARALLEL_ROW_THRESHOLD;
use crate::core::error::{Result, SubsetsError};
use crate::core::types::{Label, RowIndex};
use rayon::prelude::*;

/// `weighted_target_out[i] = weighted_target[indices[i]]`, likewise for weights.
pub fn gather_target(
    weighted_target_out: &mut [Label],
    weights_out: &mut [Label],
    weighted_target: &[Label],
    weights: &[Label],
    indices: &[RowIndex],
) -> Result<()> {
    const STAGE: &str = "gather_target";
    if weighted_target_out.len() != indices.len() || weights_out.len() != indices.len() {
        return Err(SubsetsError::kernel(
            STAGE,
            format!(
                "output sizes {}/{} for {} indices",
                weighted_target_out.len(),
                weights_out.len(),
                indices.len()
            ),
        ));
    }
    if weighted_target.len() != weights.len() {
        return Err(SubsetsError::kernel(
            STAGE,
            format!(
                "source has {} weighted targets but {} weights",
                weighted_target.len(),
                weights.len()
            ),
        ));
    }

    weighted_target_out
        .par_iter_mut()
        .zip(weights_out.par_iter_mut())
        .zip(indices.par_iter())
        .with_min_len(PARALLEL_ROW_THRESHOLD)
        .try_for_each(|((wt_out, w_out), &row)| {
            let row = row as usize;
            match (weighted_target.get(row), weights.get(row)) {
                (Some(&wt), Some(&w)) => {
                    *wt_out = wt;
                    *w_out = w;
                    Ok(())
                }
                _ => Err(SubsetsError::kernel(
                    STAGE,
                    format!("row {} outside {} source rows", row, weights.len()),
                )),
            }
        })
}
