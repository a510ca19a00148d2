//! Operations for BlockSparseTensor.
//!
//! - `permutedims_blocksparse` - permute axes (relabels and relocates blocks)
//! - `add_blocksparse` / `sub_blocksparse` - union-of-blocks combination
//! - `scale_blocksparse` / `scale_blocksparse_inplace` - multiply by a scalar
//! - `conj_blocksparse` - elementwise complex conjugate
//! - `norm_blocksparse` / `norm_sqr_blocksparse` - Frobenius norm over blocks

use crate::backend::{GenericBackend, PermutationBackend};
use crate::blocksparse_tensor::BlockSparseTensor;
use crate::error::TensorError;
use crate::operations::permutedims::validate_permutation;
use crate::scalar::Scalar;
use crate::storage::blocksparse::{BlockLabel, BlockOffsetTable, IndexSpaces};

/// Permute the axes of a BlockSparseTensor.
///
/// Every present block is relabeled with the permuted label, moved to its
/// new canonical position and permuted internally. Block and element counts
/// are unchanged.
///
/// # Errors
///
/// `InvalidPermutation` if `perm` is not a permutation of `0..ndim`.
///
/// # Example
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
/// use blocktensors::operations::permutedims_blocksparse;
/// use blocktensors::Tensor;
///
/// let spaces = IndexSpaces::new(vec![
///     IndexSpace::new(vec![2, 3]).unwrap(),
///     IndexSpace::new(vec![4, 5]).unwrap(),
/// ]);
/// let mut tensor: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], spaces).unwrap();
/// tensor.insert_block(&BlockLabel::new(&[0, 1]), &Tensor::ones(&[2, 5])).unwrap();
///
/// let transposed = permutedims_blocksparse(&tensor, &[1, 0]).unwrap();
/// assert_eq!(transposed.shape(), vec![9, 5]);
/// assert!(transposed.is_block_present(&BlockLabel::new(&[1, 0])));
/// ```
pub fn permutedims_blocksparse<ElT: Scalar>(
    tensor: &BlockSparseTensor<ElT>,
    perm: &[usize],
) -> Result<BlockSparseTensor<ElT>, TensorError> {
    validate_permutation(perm, tensor.ndim())?;

    let (offsets, spaces) = tensor.offsets().permute(perm, tensor.spaces());
    let mut data = vec![ElT::zero(); offsets.total_nonzero_elements()];

    for view in tensor.iter_blocks() {
        let new_label = view.label.permute(perm);
        let Some(entry) = offsets.entry_for(&new_label) else {
            continue;
        };
        GenericBackend::permute_into(&mut data[entry.range()], view.data, view.shape, perm);
    }

    BlockSparseTensor::from_parts(data, offsets, spaces)
}

/// Index spaces of an elementwise result.
///
/// Chunk sizes must agree on every axis. QNs must agree where both sides
/// carry them; an axis labelled on one side only takes that side's QNs.
pub(crate) fn elementwise_spaces(a: &IndexSpaces, b: &IndexSpaces) -> Result<IndexSpaces, TensorError> {
    if a.ndims() != b.ndims() {
        return Err(TensorError::WrongNumberOfIndices {
            expected: a.ndims(),
            actual: b.ndims(),
        });
    }
    let mut spaces = Vec::with_capacity(a.ndims());
    for (axis, (sa, sb)) in a.iter().zip(b.iter()).enumerate() {
        if !sa.same_structure(sb) {
            return Err(TensorError::IncompatibleIndexSpaces {
                axis,
                left: sa.chunk_sizes().to_vec(),
                right: sb.chunk_sizes().to_vec(),
            });
        }
        match (sa.qns(), sb.qns()) {
            (Some(qa), Some(qb)) if qa != qb => return Err(TensorError::IncompatibleQns { axis }),
            (None, Some(_)) => spaces.push(sb.clone()),
            _ => spaces.push(sa.clone()),
        }
    }
    Ok(IndexSpaces::new(spaces))
}

/// `a + beta * b` over the union of present blocks.
fn combine<ElT: Scalar>(
    a: &BlockSparseTensor<ElT>,
    b: &BlockSparseTensor<ElT>,
    beta: ElT,
) -> Result<BlockSparseTensor<ElT>, TensorError> {
    let spaces = elementwise_spaces(a.spaces(), b.spaces())?;

    // Both label lists are sorted; merge them.
    let mut labels: Vec<BlockLabel> = Vec::with_capacity(a.nonzero_block_count() + b.nonzero_block_count());
    let mut ia = a.offsets().labels().peekable();
    let mut ib = b.offsets().labels().peekable();
    loop {
        let next = match (ia.peek(), ib.peek()) {
            (Some(la), Some(lb)) => match la.cmp(lb) {
                std::cmp::Ordering::Less => ia.next(),
                std::cmp::Ordering::Greater => ib.next(),
                std::cmp::Ordering::Equal => {
                    ib.next();
                    ia.next()
                }
            },
            (Some(_), None) => ia.next(),
            (None, Some(_)) => ib.next(),
            (None, None) => break,
        };
        if let Some(label) = next {
            labels.push(label.clone());
        }
    }

    let offsets = BlockOffsetTable::from_sorted(labels, &spaces);
    let mut data = vec![ElT::zero(); offsets.total_nonzero_elements()];

    for view in a.iter_blocks() {
        if let Some(entry) = offsets.entry_for(view.label) {
            data[entry.range()].copy_from_slice(view.data);
        }
    }
    for view in b.iter_blocks() {
        if let Some(entry) = offsets.entry_for(view.label) {
            for (dst, &src) in data[entry.range()].iter_mut().zip(view.data) {
                *dst = *dst + beta * src;
            }
        }
    }

    BlockSparseTensor::from_parts(data, offsets, spaces)
}

/// Elementwise sum of two block-sparse tensors.
///
/// The result's present blocks are the union of both inputs' blocks. Blocks
/// present in both are added, the others are copied through.
///
/// # Errors
///
/// - `IncompatibleIndexSpaces` if any axis has different chunk sizes
/// - `IncompatibleQns` if both operands label an axis and the labels differ
///
/// # Example
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
/// use blocktensors::operations::add_blocksparse;
///
/// let spaces = IndexSpaces::new(vec![
///     IndexSpace::new(vec![2, 3]).unwrap(),
///     IndexSpace::new(vec![4, 5]).unwrap(),
/// ]);
/// let a: BlockSparseTensor<f64> =
///     BlockSparseTensor::zeros(&[BlockLabel::new(&[0, 1])], spaces.clone()).unwrap();
/// let b: BlockSparseTensor<f64> =
///     BlockSparseTensor::zeros(&[BlockLabel::new(&[1, 0])], spaces).unwrap();
///
/// let c = add_blocksparse(&a, &b).unwrap();
/// assert_eq!(c.nonzero_block_count(), 2);
/// assert_eq!(c.nonzero_element_count(), 10 + 12);
/// ```
pub fn add_blocksparse<ElT: Scalar>(
    a: &BlockSparseTensor<ElT>,
    b: &BlockSparseTensor<ElT>,
) -> Result<BlockSparseTensor<ElT>, TensorError> {
    combine(a, b, ElT::one())
}

/// Elementwise difference `a - b`, same block semantics as [`add_blocksparse`].
pub fn sub_blocksparse<ElT: Scalar>(
    a: &BlockSparseTensor<ElT>,
    b: &BlockSparseTensor<ElT>,
) -> Result<BlockSparseTensor<ElT>, TensorError> {
    combine(a, b, -ElT::one())
}

/// Scale a BlockSparseTensor by a scalar.
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
/// use blocktensors::operations::scale_blocksparse;
///
/// let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![2, 3]).unwrap()]);
/// let mut t: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], spaces).unwrap();
/// t.set(&[1], 2.0).unwrap();
///
/// let scaled = scale_blocksparse(&t, 3.0);
/// assert_eq!(scaled.get(&[1]).unwrap(), 6.0);
/// ```
pub fn scale_blocksparse<ElT: Scalar>(tensor: &BlockSparseTensor<ElT>, alpha: ElT) -> BlockSparseTensor<ElT> {
    let mut result = tensor.clone();
    scale_blocksparse_inplace(&mut result, alpha);
    result
}

/// Scale a BlockSparseTensor in place.
pub fn scale_blocksparse_inplace<ElT: Scalar>(tensor: &mut BlockSparseTensor<ElT>, alpha: ElT) {
    for x in tensor.data_mut() {
        *x = *x * alpha;
    }
}

/// Elementwise complex conjugate; the block structure is unchanged.
pub fn conj_blocksparse<ElT: Scalar>(tensor: &BlockSparseTensor<ElT>) -> BlockSparseTensor<ElT> {
    let mut result = tensor.clone();
    for x in result.data_mut() {
        *x = x.conjugate();
    }
    result
}

/// Squared Frobenius norm, summed over present blocks.
pub fn norm_sqr_blocksparse<ElT: Scalar>(tensor: &BlockSparseTensor<ElT>) -> f64 {
    tensor.data().iter().map(|x| x.modulus_sqr()).sum()
}

/// Frobenius norm.
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::storage::blocksparse::{IndexSpace, IndexSpaces};
/// use blocktensors::operations::norm_blocksparse;
///
/// let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![2, 3]).unwrap()]);
/// let mut t: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], spaces).unwrap();
/// t.set(&[0], 3.0).unwrap();
/// t.set(&[4], 4.0).unwrap();
/// assert!((norm_blocksparse(&t) - 5.0).abs() < 1e-12);
/// ```
pub fn norm_blocksparse<ElT: Scalar>(tensor: &BlockSparseTensor<ElT>) -> f64 {
    norm_sqr_blocksparse(tensor).sqrt()
}

impl<ElT: Scalar> BlockSparseTensor<ElT> {
    /// See [`permutedims_blocksparse`].
    pub fn permute(&self, perm: &[usize]) -> Result<Self, TensorError> {
        permutedims_blocksparse(self, perm)
    }

    /// See [`add_blocksparse`].
    pub fn add(&self, other: &Self) -> Result<Self, TensorError> {
        add_blocksparse(self, other)
    }

    /// See [`sub_blocksparse`].
    pub fn sub(&self, other: &Self) -> Result<Self, TensorError> {
        sub_blocksparse(self, other)
    }

    pub fn scale(&self, alpha: ElT) -> Self {
        scale_blocksparse(self, alpha)
    }

    pub fn scale_inplace(&mut self, alpha: ElT) {
        scale_blocksparse_inplace(self, alpha)
    }

    pub fn conj(&self) -> Self {
        conj_blocksparse(self)
    }

    pub fn norm(&self) -> f64 {
        norm_blocksparse(self)
    }

    pub fn norm_sqr(&self) -> f64 {
        norm_sqr_blocksparse(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::c64;
    use crate::storage::blocksparse::{IndexSpace, Qn};
    use approx::assert_relative_eq;

    fn create_test_spaces() -> IndexSpaces {
        IndexSpaces::new(vec![
            IndexSpace::new(vec![2, 3]).unwrap(),
            IndexSpace::new(vec![4, 5]).unwrap(),
        ])
    }

    fn filled(labels: &[BlockLabel], start: f64) -> BlockSparseTensor<f64> {
        let mut t = BlockSparseTensor::zeros(labels, create_test_spaces()).unwrap();
        for (i, x) in t.data_mut().iter_mut().enumerate() {
            *x = start + i as f64;
        }
        t
    }

    #[test]
    fn test_permute_transpose_elements() {
        let t = filled(&[BlockLabel::new(&[0, 1]), BlockLabel::new(&[1, 0])], 1.0);
        let p = permutedims_blocksparse(&t, &[1, 0]).unwrap();

        assert_eq!(p.shape(), vec![9, 5]);
        assert_eq!(p.nonzero_block_count(), 2);
        assert_eq!(p.nonzero_element_count(), t.nonzero_element_count());
        for i in 0..5 {
            for j in 0..9 {
                assert_eq!(t.get(&[i, j]).unwrap(), p.get(&[j, i]).unwrap());
            }
        }
    }

    #[test]
    fn test_permute_3d_and_back() {
        let spaces = IndexSpaces::new(vec![
            IndexSpace::new(vec![1, 2]).unwrap(),
            IndexSpace::new(vec![2, 1]).unwrap(),
            IndexSpace::new(vec![3]).unwrap(),
        ]);
        let labels = vec![BlockLabel::new(&[0, 1, 0]), BlockLabel::new(&[1, 0, 0])];
        let mut t: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&labels, spaces).unwrap();
        for (i, x) in t.data_mut().iter_mut().enumerate() {
            *x = i as f64 + 0.5;
        }

        let p = t.permute(&[2, 0, 1]).unwrap();
        assert_eq!(p.shape(), vec![3, 3, 3]);
        assert_eq!(t.get(&[2, 1, 2]).unwrap(), p.get(&[2, 2, 1]).unwrap());
        assert_eq!(p.permute(&[1, 2, 0]).unwrap(), t);
    }

    #[test]
    fn test_permute_invalid() {
        let t = filled(&[BlockLabel::new(&[0, 0])], 0.0);
        assert!(matches!(
            permutedims_blocksparse(&t, &[0, 0]),
            Err(TensorError::InvalidPermutation { .. })
        ));
    }

    #[test]
    fn test_add_overlapping_blocks() {
        let a = filled(&[BlockLabel::new(&[0, 0]), BlockLabel::new(&[1, 1])], 1.0);
        let b = filled(&[BlockLabel::new(&[1, 1]), BlockLabel::new(&[1, 0])], 100.0);
        let c = add_blocksparse(&a, &b).unwrap();

        assert_eq!(c.nonzero_block_count(), 3);
        assert_eq!(c.nonzero_element_count(), 8 + 12 + 15);
        for i in 0..5 {
            for j in 0..9 {
                assert_relative_eq!(
                    c.get(&[i, j]).unwrap(),
                    a.get(&[i, j]).unwrap() + b.get(&[i, j]).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_sub_self_is_zero() {
        let a = filled(&[BlockLabel::new(&[0, 1])], 1.0);
        let d = a.sub(&a).unwrap();
        assert_eq!(d.nonzero_block_count(), 1);
        assert_relative_eq!(d.norm(), 0.0);
    }

    #[test]
    fn test_add_incompatible() {
        let a = filled(&[BlockLabel::new(&[0, 0])], 1.0);
        let other = IndexSpaces::new(vec![
            IndexSpace::new(vec![2, 3]).unwrap(),
            IndexSpace::new(vec![5, 4]).unwrap(),
        ]);
        let b: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], other).unwrap();
        assert_eq!(
            add_blocksparse(&a, &b).unwrap_err(),
            TensorError::IncompatibleIndexSpaces {
                axis: 1,
                left: vec![4, 5],
                right: vec![5, 4]
            }
        );
    }

    #[test]
    fn test_add_checks_qns() {
        let q = |c: i32| Qn::new(&[c]);
        let labelled = |qns: Vec<Qn>| {
            IndexSpaces::new(vec![IndexSpace::with_qns(vec![2, 3], qns).unwrap()])
        };
        let a: BlockSparseTensor<f64> =
            BlockSparseTensor::zeros(&[BlockLabel::new(&[0])], labelled(vec![q(0), q(1)])).unwrap();
        let flipped: BlockSparseTensor<f64> =
            BlockSparseTensor::zeros(&[], labelled(vec![q(1), q(0)])).unwrap();
        assert_eq!(
            add_blocksparse(&a, &flipped).unwrap_err(),
            TensorError::IncompatibleQns { axis: 0 }
        );

        // An unlabelled operand adopts the labels of the other
        let plain: BlockSparseTensor<f64> = BlockSparseTensor::zeros(
            &[BlockLabel::new(&[1])],
            IndexSpaces::new(vec![IndexSpace::new(vec![2, 3]).unwrap()]),
        )
        .unwrap();
        let sum = add_blocksparse(&plain, &a).unwrap();
        assert_eq!(sum.spaces()[0].qns(), Some(&[q(0), q(1)][..]));
        assert_eq!(sum.nonzero_block_count(), 2);
    }

    #[test]
    fn test_scale_and_norm() {
        let mut t = filled(&[BlockLabel::new(&[0, 0])], 1.0);
        let expected: f64 = (1..=8).map(|x| (x * x) as f64).sum();
        assert_relative_eq!(t.norm_sqr(), expected);

        t.scale_inplace(2.0);
        assert_relative_eq!(t.norm_sqr(), 4.0 * expected);
        assert_relative_eq!(t.scale(0.5).norm(), expected.sqrt());
    }

    #[test]
    fn test_conj_complex() {
        let mut t: BlockSparseTensor<c64> = BlockSparseTensor::zeros(&[], create_test_spaces()).unwrap();
        t.set(&[0, 0], c64::new(1.0, 2.0)).unwrap();
        let c = t.conj();
        assert_eq!(c.get(&[0, 0]).unwrap(), c64::new(1.0, -2.0));
        assert_relative_eq!(c.norm_sqr(), 5.0);
    }
}
