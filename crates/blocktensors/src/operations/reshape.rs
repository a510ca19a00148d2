//! Combining adjacent axes into one and splitting them back.
//!
//! A combined axis has one chunk per tuple of source chunks, tuples ordered
//! row-major (last merged axis fastest). Row-major tuple order agrees with
//! lexicographic label order, so block order and the arena are untouched:
//! both directions only relabel blocks. Inside a block the merged axis keeps
//! the column-major element order of the source axes.

use log::debug;

use crate::blocksparse_tensor::BlockSparseTensor;
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::storage::blocksparse::{BlockLabel, BlockOffsetTable, IndexSpace, IndexSpaces};
use crate::strides::{row_major_cartesian, row_major_linear};

/// Merge axes `start..start + count` into a single axis.
///
/// # Errors
///
/// `InvalidAxisRange` if the range is empty or runs past the last axis.
///
/// # Example
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
/// use blocktensors::operations::combine_axes;
///
/// let spaces = IndexSpaces::new(vec![
///     IndexSpace::new(vec![1, 2]).unwrap(),
///     IndexSpace::new(vec![3, 4]).unwrap(),
///     IndexSpace::new(vec![5]).unwrap(),
/// ]);
/// let t: BlockSparseTensor<f64> =
///     BlockSparseTensor::zeros(&[BlockLabel::new(&[1, 0, 0])], spaces).unwrap();
///
/// let c = combine_axes(&t, 0, 2).unwrap();
/// assert_eq!(c.spaces()[0].chunk_sizes(), &[3, 4, 6, 8]);
/// // chunk tuple (1, 0) is merged chunk 1 * 2 + 0
/// assert!(c.is_block_present(&BlockLabel::new(&[2, 0])));
/// ```
pub fn combine_axes<ElT: Scalar>(
    tensor: &BlockSparseTensor<ElT>,
    start: usize,
    count: usize,
) -> Result<BlockSparseTensor<ElT>, TensorError> {
    let ndim = tensor.ndim();
    if count == 0 || start + count > ndim {
        return Err(TensorError::InvalidAxisRange {
            start,
            end: start + count,
            ndim,
        });
    }

    let source = tensor.spaces().as_slice();
    let merged_from: Vec<&IndexSpace> = source[start..start + count].iter().collect();
    let merged = IndexSpace::merge(&merged_from)?;
    let extents: Vec<usize> = merged_from.iter().map(|s| s.nchunks()).collect();

    let mut spaces = Vec::with_capacity(ndim - count + 1);
    spaces.extend_from_slice(&source[..start]);
    spaces.push(merged);
    spaces.extend_from_slice(&source[start + count..]);
    let spaces = IndexSpaces::new(spaces);

    let axes: Vec<usize> = (start..start + count).collect();
    let labels: Vec<BlockLabel> = tensor
        .offsets()
        .labels()
        .map(|label| label.merge_range(start, count, row_major_linear(&label.select(&axes), &extents)))
        .collect();

    debug!(
        "combine_axes: axes {}..{} -> {} chunks, {} blocks",
        start,
        start + count,
        spaces[start].nchunks(),
        labels.len()
    );

    let offsets = BlockOffsetTable::from_sorted(labels, &spaces);
    BlockSparseTensor::from_parts(tensor.data().to_vec(), offsets, spaces)
}

/// Split `axis` into the axes described by `targets`.
///
/// `targets` must merge (see [`combine_axes`]) into exactly the chunk
/// structure of `axis`; if both sides carry QNs they must agree as well.
///
/// # Errors
///
/// - `InvalidAxisRange` if `axis` is out of range
/// - `IncompatibleReshapeTarget` if the targets' total dimension differs
///   from the axis, or their merged chunk structure does
pub fn split_axis<ElT: Scalar>(
    tensor: &BlockSparseTensor<ElT>,
    axis: usize,
    targets: &[IndexSpace],
) -> Result<BlockSparseTensor<ElT>, TensorError> {
    let ndim = tensor.ndim();
    if axis >= ndim || targets.is_empty() {
        return Err(TensorError::InvalidAxisRange {
            start: axis,
            end: axis + targets.len(),
            ndim,
        });
    }

    let source = tensor.spaces().space(axis);
    let target_dim: usize = targets.iter().map(|s| s.dim()).product();
    if target_dim != source.dim() {
        return Err(TensorError::IncompatibleReshapeTarget {
            expected: source.dim(),
            actual: target_dim,
        });
    }

    let target_refs: Vec<&IndexSpace> = targets.iter().collect();
    let merged = IndexSpace::merge(&target_refs)?;
    let qns_disagree = source.has_qns() && merged.has_qns() && source.qns() != merged.qns();
    if !merged.same_structure(source) || qns_disagree {
        return Err(TensorError::IncompatibleReshapeTarget {
            expected: source.nchunks(),
            actual: merged.nchunks(),
        });
    }
    let extents: Vec<usize> = targets.iter().map(|s| s.nchunks()).collect();

    let mut spaces = Vec::with_capacity(ndim + targets.len() - 1);
    spaces.extend_from_slice(&tensor.spaces().as_slice()[..axis]);
    spaces.extend_from_slice(targets);
    spaces.extend_from_slice(&tensor.spaces().as_slice()[axis + 1..]);
    let spaces = IndexSpaces::new(spaces);

    let labels: Vec<BlockLabel> = tensor
        .offsets()
        .labels()
        .map(|label| label.expand_at(axis, &row_major_cartesian(label[axis], &extents)))
        .collect();

    debug!(
        "split_axis: axis {} -> {} axes, {} blocks",
        axis,
        targets.len(),
        labels.len()
    );

    let offsets = BlockOffsetTable::from_sorted(labels, &spaces);
    BlockSparseTensor::from_parts(tensor.data().to_vec(), offsets, spaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::blocksparse::Qn;

    fn three_axis_tensor() -> BlockSparseTensor<f64> {
        let spaces = IndexSpaces::new(vec![
            IndexSpace::new(vec![1, 2]).unwrap(),
            IndexSpace::new(vec![2, 3]).unwrap(),
            IndexSpace::new(vec![2, 2]).unwrap(),
        ]);
        let labels = vec![
            BlockLabel::new(&[0, 1, 0]),
            BlockLabel::new(&[1, 0, 1]),
            BlockLabel::new(&[1, 1, 0]),
        ];
        let mut t = BlockSparseTensor::zeros(&labels, spaces).unwrap();
        for (i, x) in t.data_mut().iter_mut().enumerate() {
            *x = (i + 1) as f64;
        }
        t
    }

    #[test]
    fn test_combine_preserves_counts_and_data() {
        let t = three_axis_tensor();
        let c = combine_axes(&t, 1, 2).unwrap();

        assert_eq!(c.ndim(), 2);
        assert_eq!(c.spaces()[1].chunk_sizes(), &[4, 4, 6, 6]);
        assert_eq!(c.nonzero_block_count(), t.nonzero_block_count());
        assert_eq!(c.nonzero_element_count(), t.nonzero_element_count());
        assert_eq!(c.data(), t.data());

        let labels: Vec<_> = c.offsets().labels().map(|l| l.coords().to_vec()).collect();
        assert_eq!(labels, vec![vec![0, 2], vec![1, 1], vec![1, 2]]);
    }

    #[test]
    fn test_combine_element_mapping() {
        let t = three_axis_tensor();
        let c = combine_axes(&t, 1, 2).unwrap();

        // Block (1,0,1) of t -> block (1,1) of c; inner index j + 2 * k
        let src = t.block_view(&BlockLabel::new(&[1, 0, 1])).unwrap();
        let dst = c.block_view(&BlockLabel::new(&[1, 1])).unwrap();
        assert_eq!(dst.shape, &[2, 4]);
        assert_eq!(src.get(&[1, 1, 1]), dst.get(&[1, 3]));
        assert_eq!(src.get(&[0, 0, 1]), dst.get(&[0, 2]));
    }

    #[test]
    fn test_combine_then_split_roundtrip() {
        let t = three_axis_tensor();
        let targets = vec![t.spaces()[0].clone(), t.spaces()[1].clone()];
        let c = combine_axes(&t, 0, 2).unwrap();
        let back = split_axis(&c, 0, &targets).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_combine_invalid_range() {
        let t = three_axis_tensor();
        assert_eq!(
            combine_axes(&t, 2, 2).unwrap_err(),
            TensorError::InvalidAxisRange {
                start: 2,
                end: 4,
                ndim: 3
            }
        );
        assert!(combine_axes(&t, 0, 0).is_err());
    }

    #[test]
    fn test_split_wrong_dimension() {
        let t = three_axis_tensor();
        let targets = vec![IndexSpace::new(vec![2]).unwrap(), IndexSpace::new(vec![2]).unwrap()];
        assert_eq!(
            split_axis(&t, 1, &targets).unwrap_err(),
            TensorError::IncompatibleReshapeTarget {
                expected: 5,
                actual: 4
            }
        );
    }

    #[test]
    fn test_split_wrong_chunk_structure() {
        let t = three_axis_tensor();
        let c = combine_axes(&t, 1, 2).unwrap();
        // Same total dimension 20 but merged chunks [20] instead of [4, 4, 6, 6]
        let targets = vec![IndexSpace::new(vec![4]).unwrap(), IndexSpace::new(vec![5]).unwrap()];
        assert!(matches!(
            split_axis(&c, 1, &targets),
            Err(TensorError::IncompatibleReshapeTarget { .. })
        ));
    }

    #[test]
    fn test_combine_sums_qns() {
        let q = |c: i32| Qn::new(&[c]);
        let a = IndexSpace::with_qns(vec![1, 1], vec![q(1), q(-1)]).unwrap();
        let b = IndexSpace::with_qns(vec![1, 1], vec![q(1), q(-1)]).unwrap();
        let t: BlockSparseTensor<f64> =
            BlockSparseTensor::zeros(&[BlockLabel::new(&[0, 1])], IndexSpaces::new(vec![a, b])).unwrap();

        let c = combine_axes(&t, 0, 2).unwrap();
        assert_eq!(
            c.spaces()[0].qns().unwrap(),
            &[q(2), q(0), q(0), q(-2)]
        );
        assert_eq!(c.block_flux(&BlockLabel::new(&[1])), Some(Qn::zero()));
    }
}
