//! Compressed per-device feature encoding consumed by the sharded split.
//!
//! Binarized feature values are packed into 32-bit words. Features sharing a
//! word form a group; on a device with `n` rows group `g` occupies words
//! `g * n..(g + 1) * n`, one word per row.

use crate::core::error::{Result, SubsetsError};
use crate::core::types::{BinIndex, DeviceId};
use crate::device::{DistributedObject, Mapping, StripeMapping};
use serde::{Deserialize, Serialize};

/// Location of one feature inside a device's compressed words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CFeature {
    /// Feature id
    pub index: u32,
    /// First word of the feature's group on this device
    pub offset: usize,
    /// Bit position of the value inside the word
    pub shift: u32,
    /// Value mask applied after shifting
    pub mask: u32,
    /// Split by equality instead of by threshold
    pub one_hot: bool,
}

impl CFeature {
    /// Unpack this feature's value from a word.
    pub fn extract(&self, word: u32) -> u32 {
        (word >> self.shift) & self.mask
    }
}

/// Packed feature values of every row, sharded by row.
#[derive(Debug, Clone)]
pub struct CompressedIndex {
    mapping: StripeMapping,
    words: Vec<Vec<u32>>,
    features: Vec<DistributedObject<CFeature>>,
}

impl CompressedIndex {
    /// Row layout the index was built for.
    pub fn mapping(&self) -> &StripeMapping {
        &self.mapping
    }

    /// Compressed words of `dev`.
    pub fn words(&self, dev: DeviceId) -> Result<&[u32]> {
        self.mapping.check_device(dev)?;
        Ok(&self.words[dev])
    }

    /// Per-device descriptor of `feature`.
    pub fn feature(&self, feature: usize) -> Result<&DistributedObject<CFeature>> {
        self.features.get(feature).ok_or_else(|| {
            SubsetsError::invalid_parameter(
                "feature",
                feature.to_string(),
                format!("index has {} features", self.features.len()),
            )
        })
    }

    /// Number of encoded features.
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}

#[derive(Debug)]
struct PendingFeature {
    values: Vec<BinIndex>,
    bits: u32,
    one_hot: bool,
}

/// Packs binarized feature columns into a [`CompressedIndex`].
#[derive(Debug)]
pub struct CompressedIndexBuilder {
    mapping: StripeMapping,
    pending: Vec<PendingFeature>,
}

impl CompressedIndexBuilder {
    /// Start an index for rows laid out by `mapping`.
    pub fn new(mapping: StripeMapping) -> Self {
        CompressedIndexBuilder {
            mapping,
            pending: Vec::new(),
        }
    }

    /// Add one feature column of per-row bin values (global row order).
    /// Returns the feature id.
    pub fn add_feature(&mut self, values: &[BinIndex], one_hot: bool) -> Result<usize> {
        if values.len() != self.mapping.total_size() {
            return Err(SubsetsError::dimension_mismatch(
                format!("{} rows", self.mapping.total_size()),
                format!("{} feature values", values.len()),
            ));
        }
        let max_value = values.iter().copied().max().unwrap_or(0);
        let bits = (32 - max_value.leading_zeros()).max(1);
        self.pending.push(PendingFeature {
            values: values.to_vec(),
            bits,
            one_hot,
        });
        Ok(self.pending.len() - 1)
    }

    /// Pack all added features.
    pub fn build(self) -> CompressedIndex {
        let mut layout = Vec::with_capacity(self.pending.len());
        let mut group = 0usize;
        let mut used_bits = 0u32;
        for feature in &self.pending {
            if used_bits + feature.bits > 32 {
                group += 1;
                used_bits = 0;
            }
            layout.push((group, used_bits));
            used_bits += feature.bits;
        }
        let group_count = if self.pending.is_empty() { 0 } else { group + 1 };

        let num_devices = self.mapping.device_count();
        let mut words: Vec<Vec<u32>> = (0..num_devices)
            .map(|dev| vec![0u32; group_count * self.mapping.device_size(dev)])
            .collect();
        let mut features = Vec::with_capacity(self.pending.len());

        for (id, (feature, &(group, shift))) in self.pending.iter().zip(&layout).enumerate() {
            let mask = if feature.bits >= 32 {
                u32::MAX
            } else {
                (1u32 << feature.bits) - 1
            };
            let mut descriptors = Vec::with_capacity(num_devices);
            for (dev, device_words) in words.iter_mut().enumerate() {
                let range = self.mapping.device_range(dev);
                let offset = group * range.len();
                for (local, &value) in feature.values[range].iter().enumerate() {
                    device_words[offset + local] |= (value & mask) << shift;
                }
                descriptors.push(CFeature {
                    index: id as u32,
                    offset,
                    shift,
                    mask,
                    one_hot: feature.one_hot,
                });
            }
            features.push(DistributedObject::new(descriptors));
        }

        log::debug!(
            "Packed {} features into {} word groups over {} devices",
            features.len(),
            group_count,
            num_devices
        );

        CompressedIndex {
            mapping: self.mapping,
            words,
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_and_extract() {
        let mapping = StripeMapping::split_to_devices(4, 2);
        let mut builder = CompressedIndexBuilder::new(mapping);
        let a = builder.add_feature(&[0, 1, 2, 3], false).unwrap();
        let b = builder.add_feature(&[1, 0, 1, 0], true).unwrap();
        let index = builder.build();

        assert_eq!(index.feature_count(), 2);
        for dev in 0..2 {
            let words = index.words(dev).unwrap();
            let fa = index.feature(a).unwrap().get(dev).unwrap();
            let fb = index.feature(b).unwrap().get(dev).unwrap();
            let decoded_a: Vec<u32> = (0..2).map(|r| fa.extract(words[fa.offset + r])).collect();
            let decoded_b: Vec<u32> = (0..2).map(|r| fb.extract(words[fb.offset + r])).collect();
            let start = dev * 2;
            assert_eq!(decoded_a, [0u32, 1, 2, 3][start..start + 2].to_vec());
            assert_eq!(decoded_b, [1u32, 0, 1, 0][start..start + 2].to_vec());
        }
    }

    #[test]
    fn test_groups_overflow_into_new_words() {
        let mapping = StripeMapping::split_to_devices(3, 1);
        let mut builder = CompressedIndexBuilder::new(mapping);
        for _ in 0..3 {
            builder.add_feature(&[0, 1 << 12, 5], false).unwrap();
        }
        let index = builder.build();
        // 13 bits each: two fit into one word, the third starts a new group.
        let third = index.feature(2).unwrap().get(0).unwrap();
        assert_eq!(third.offset, 3);
        assert_eq!(third.shift, 0);
        assert_eq!(index.words(0).unwrap().len(), 6);
        assert_eq!(third.extract(index.words(0).unwrap()[third.offset + 1]), 1 << 12);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let mut builder = CompressedIndexBuilder::new(StripeMapping::split_to_devices(3, 1));
        assert!(builder.add_feature(&[0, 1], false).is_err());
        assert!(builder.build().feature(0).is_err());
    }
}
