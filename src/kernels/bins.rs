//! Bin update primitives.
//!
//! Bins are indexed by device-local row. Each update sets exactly one new bit
//! per row, directly above the bits already in use.

use crate::compressed_index::CFeature;
use crate::core::constants::{MAX_BIN_BITS, PARALLEL_ROW_THRESHOLD};
use crate::core::error::{Result, SubsetsError};
use crate::core::types::{BinIndex, RowIndex};
use rayon::prelude::*;

/// Set every entry of `buffer` to `value`.
pub fn fill_buffer<T: Copy + Send + Sync>(buffer: &mut [T], value: T) {
    buffer
        .par_iter_mut()
        .with_min_len(PARALLEL_ROW_THRESHOLD)
        .for_each(|entry| *entry = value);
}

/// Write the identity permutation `0..len` into `buffer`.
pub fn make_sequence(buffer: &mut [RowIndex]) {
    buffer
        .par_iter_mut()
        .with_min_len(PARALLEL_ROW_THRESHOLD)
        .enumerate()
        .for_each(|(i, entry)| *entry = i as RowIndex);
}

fn check_shift(stage: &str, shift: u32) -> Result<()> {
    if shift > MAX_BIN_BITS {
        return Err(SubsetsError::kernel(
            stage,
            format!("bin bit {} exceeds the {}-bit limit", shift, MAX_BIN_BITS),
        ));
    }
    Ok(())
}

fn check_lengths(stage: &str, bins: usize, docs: usize) -> Result<()> {
    if bins != docs {
        return Err(SubsetsError::kernel(
            stage,
            format!("{} bins but {} mapped documents", bins, docs),
        ));
    }
    Ok(())
}

/// Check that every entry of `doc_map` addresses one of `next_level_len`
/// next-level bins. Nothing is written.
pub fn check_doc_map(next_level_len: usize, doc_map: &[RowIndex]) -> Result<()> {
    match doc_map.par_iter().find_any(|&&doc| doc as usize >= next_level_len) {
        Some(doc) => Err(SubsetsError::kernel(
            "update_bins",
            format!("document {} outside {} next-level bins", doc, next_level_len),
        )),
        None => Ok(()),
    }
}

/// Check that every document of `docs_for_bins` has a word of `feature` in
/// a compressed index of `words` words. Nothing is written.
pub fn check_compressed_docs(words: usize, feature: &CFeature, docs_for_bins: &[RowIndex]) -> Result<()> {
    match docs_for_bins
        .par_iter()
        .find_any(|&&doc| feature.offset + doc as usize >= words)
    {
        Some(doc) => Err(SubsetsError::kernel(
            "update_bin_from_compressed_index",
            format!(
                "document {} of feature {} outside {} index words",
                doc, feature.index, words
            ),
        )),
        None => Ok(()),
    }
}

/// Merge the next tree level into `bins`.
///
/// `next_level_bins` holds the leaf index of every source document in the
/// tree being grown, so the new level is bit `depth` of that index. For row
/// `r` the bit is read from `next_level_bins[doc_map[r]]` and stored at bit
/// `depth + fold_bits` of `bins[r]`. All inputs are checked before the first
/// row is written.
pub fn update_bins(
    bins: &mut [BinIndex],
    next_level_bins: &[BinIndex],
    doc_map: &[RowIndex],
    depth: u32,
    fold_bits: u32,
) -> Result<()> {
    const STAGE: &str = "update_bins";
    let shift = depth + fold_bits;
    check_shift(STAGE, shift)?;
    check_lengths(STAGE, bins.len(), doc_map.len())?;
    check_doc_map(next_level_bins.len(), doc_map)?;

    bins.par_iter_mut()
        .zip(doc_map.par_iter())
        .with_min_len(PARALLEL_ROW_THRESHOLD)
        .for_each(|(bin, &doc)| {
            *bin |= ((next_level_bins[doc as usize] >> depth) & 1) << shift;
        });
    Ok(())
}

/// Derive the new bin bit from a compressed feature column.
///
/// Row `r` reads the packed value of document `docs_for_bins[r]`; the bit is
/// `value == bin` for one-hot features and `value > bin` otherwise, and is
/// stored at bit `shift` of `bins[r]`. All inputs are checked before the
/// first row is written.
pub fn update_bin_from_compressed_index(
    cindex: &[u32],
    feature: &CFeature,
    bin: u32,
    docs_for_bins: &[RowIndex],
    shift: u32,
    bins: &mut [BinIndex],
) -> Result<()> {
    const STAGE: &str = "update_bin_from_compressed_index";
    check_shift(STAGE, shift)?;
    check_lengths(STAGE, bins.len(), docs_for_bins.len())?;
    check_compressed_docs(cindex.len(), feature, docs_for_bins)?;

    bins.par_iter_mut()
        .zip(docs_for_bins.par_iter())
        .with_min_len(PARALLEL_ROW_THRESHOLD)
        .for_each(|(row_bin, &doc)| {
            let value = feature.extract(cindex[feature.offset + doc as usize]);
            let goes_right = if feature.one_hot { value == bin } else { value > bin };
            *row_bin |= u32::from(goes_right) << shift;
        });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_and_sequence() {
        let mut buffer = vec![5u32; 6];
        fill_buffer(&mut buffer, 0);
        assert_eq!(buffer, vec![0; 6]);
        make_sequence(&mut buffer);
        assert_eq!(buffer, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_update_bins_first_level() {
        let mut bins = vec![0u32; 8];
        let next: Vec<u32> = (0..8).map(|r| r % 2).collect();
        let doc_map: Vec<u32> = (0..8).collect();
        update_bins(&mut bins, &next, &doc_map, 0, 0).unwrap();
        assert_eq!(bins, vec![0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_update_bins_reads_level_bit_and_respects_folds() {
        // Depth 1 with one fold bit: bit 1 of the leaf index lands at bit 2.
        let mut bins = vec![0b01u32, 0b00, 0b11, 0b10];
        let next = vec![0b10u32, 0b01, 0b11, 0b00];
        let doc_map = vec![0u32, 1, 2, 3];
        update_bins(&mut bins, &next, &doc_map, 1, 1).unwrap();
        assert_eq!(bins, vec![0b101, 0b000, 0b111, 0b010]);
    }

    #[test]
    fn test_update_bins_uses_doc_map() {
        let mut bins = vec![0u32; 3];
        let next = vec![1u32, 0, 0];
        let doc_map = vec![2u32, 2, 0];
        update_bins(&mut bins, &next, &doc_map, 0, 0).unwrap();
        assert_eq!(bins, vec![0, 0, 1]);
    }

    #[test]
    fn test_update_bins_rejects_bad_input() {
        let mut bins = vec![0u32; 2];
        assert!(update_bins(&mut bins, &[0, 1], &[0], 0, 0).is_err());
        assert!(update_bins(&mut bins, &[0, 1], &[0, 5], 0, 0).is_err());
        assert!(update_bins(&mut bins, &[0, 1], &[0, 1], 30, 2).is_err());
    }

    #[test]
    fn test_rejected_update_leaves_bins_untouched() {
        let mut bins = vec![0u32; 4];
        assert!(update_bins(&mut bins, &[1, 1, 1, 1], &[0, 1, 9, 3], 0, 0).is_err());
        assert_eq!(bins, vec![0; 4]);

        let feature = CFeature {
            index: 3,
            offset: 2,
            shift: 0,
            mask: 0xF,
            one_hot: false,
        };
        let cindex = vec![7u32; 5];
        assert!(check_compressed_docs(cindex.len(), &feature, &[0, 1, 2]).is_ok());
        assert!(update_bin_from_compressed_index(&cindex, &feature, 0, &[0, 1, 3], 0, &mut bins[..3]).is_err());
        assert_eq!(bins, vec![0; 4]);
    }

    #[test]
    fn test_update_bin_from_compressed_index() {
        let feature = CFeature {
            index: 0,
            offset: 0,
            shift: 4,
            mask: 0xF,
            one_hot: false,
        };
        // Packed values 0..4 in the second nibble.
        let cindex: Vec<u32> = (0..4).map(|v| v << 4 | 0xF).collect();
        let docs: Vec<u32> = (0..4).collect();
        let mut bins = vec![0u32; 4];
        update_bin_from_compressed_index(&cindex, &feature, 1, &docs, 0, &mut bins).unwrap();
        assert_eq!(bins, vec![0, 0, 1, 1]);

        let one_hot = CFeature { one_hot: true, ..feature };
        let mut bins = vec![0u32; 4];
        update_bin_from_compressed_index(&cindex, &one_hot, 1, &docs, 2, &mut bins).unwrap();
        assert_eq!(bins, vec![0, 4, 0, 0]);
    }
}
