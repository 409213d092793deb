//! Per-row target sources consumed by the stats refresh.

use crate::core::error::{Result, SubsetsError};
use crate::core::types::{DeviceId, Hist, Label};
use crate::device::{DeviceBuffer, Mapping};
use ndarray::ArrayView1;

/// Per-row weighted-target and weight values laid out over devices.
pub trait TargetSource<M: Mapping>: Send + Sync {
    /// Row layout of the values.
    fn mapping(&self) -> &M;

    /// `weight * target` of every row on `dev`.
    fn weighted_target(&self, dev: DeviceId) -> Result<&[Label]>;

    /// Weight of every row on `dev`.
    fn weights(&self, dev: DeviceId) -> Result<&[Label]>;
}

/// Weighted squared-error target: stores `weight * target` and `weight`.
#[derive(Debug, Clone)]
pub struct L2Target<M: Mapping> {
    weighted_target: DeviceBuffer<Label, M>,
    weights: DeviceBuffer<Label, M>,
}

impl<M: Mapping> L2Target<M> {
    /// Build from host arrays in logical row order; weights default to 1.
    pub fn from_arrays(
        targets: ArrayView1<'_, Label>,
        weights: Option<ArrayView1<'_, Label>>,
        mapping: M,
    ) -> Result<Self> {
        let weights: Vec<Label> = match weights {
            Some(w) => {
                if w.len() != targets.len() {
                    return Err(SubsetsError::dimension_mismatch(
                        format!("{} weights", targets.len()),
                        format!("{} weights", w.len()),
                    ));
                }
                w.to_vec()
            }
            None => vec![1.0; targets.len()],
        };
        let weighted_target: Vec<Label> = targets
            .iter()
            .zip(&weights)
            .map(|(&t, &w)| t * w)
            .collect();

        Ok(L2Target {
            weighted_target: DeviceBuffer::from_host(&weighted_target, mapping.clone())?,
            weights: DeviceBuffer::from_host(&weights, mapping)?,
        })
    }

    /// Adopt device buffers that already hold `weight * target` and `weight`.
    pub fn from_device_buffers(
        weighted_target: DeviceBuffer<Label, M>,
        weights: DeviceBuffer<Label, M>,
    ) -> Result<Self> {
        if weighted_target.mapping() != weights.mapping() {
            return Err(SubsetsError::dimension_mismatch(
                format!("{:?}", weighted_target.mapping()),
                format!("{:?}", weights.mapping()),
            ));
        }
        Ok(L2Target {
            weighted_target,
            weights,
        })
    }

    /// Sum of all logical row weights.
    pub fn total_weight(&self) -> Hist {
        self.weights.to_host().iter().map(|&w| Hist::from(w)).sum()
    }

    /// Sum of all logical `weight * target` values.
    pub fn total_weighted_target(&self) -> Hist {
        self.weighted_target
            .to_host()
            .iter()
            .map(|&wt| Hist::from(wt))
            .sum()
    }
}

impl<M: Mapping> TargetSource<M> for L2Target<M> {
    fn mapping(&self) -> &M {
        self.weights.mapping()
    }

    fn weighted_target(&self, dev: DeviceId) -> Result<&[Label]> {
        self.weighted_target.device_view(dev)
    }

    fn weights(&self, dev: DeviceId) -> Result<&[Label]> {
        self.weights.device_view(dev)
    }
}
