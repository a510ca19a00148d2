//! Block-sparse tensor contraction.
//!
//! For `C[i,k] = sum_j A[i,j] * B[j,k]` at the block level:
//! - `C` block `(i_b, k_b)` = `sum_{j_b} A[i_b, j_b] * B[j_b, k_b]`
//! - the sum runs only over `j_b` where both blocks are present
//!
//! B's blocks are indexed by their contracted chunk tuple, so the work is
//! proportional to the number of matching block pairs. Pairs are visited in
//! canonical (A label, B label) order and each one is a single faer GEMM
//! accumulated into its output block.

use std::collections::{BTreeMap, HashMap};

use faer::linalg::matmul::matmul;
use faer::{Accum, Par};
use log::debug;
use smallvec::SmallVec;

use crate::backend::{GenericBackend, PermutationBackend, slice_as_mat, slice_as_mat_mut};
use crate::blocksparse_tensor::BlockSparseTensor;
use crate::contract::properties::{ContractionProperties, check_label_counts};
use crate::error::TensorError;
use crate::operations::permutedims_blocksparse;
use crate::scalar::Scalar;
use crate::storage::blocksparse::{BlockEntry, BlockLabel, BlockOffsetTable, IndexSpace, IndexSpaces};

type ChunkKey = SmallVec<[usize; 8]>;

/// Contract two block-sparse tensors over shared negative labels.
///
/// Labels follow the dense [`contract`](crate::contract::contract): negative
/// labels present in both tensors are summed over, all other axes appear in
/// the output in ascending label order. A full contraction yields a tensor
/// with one axis of one chunk of size 1.
///
/// # Errors
///
/// - `WrongNumberOfIndices` if a label list does not match its tensor's rank
/// - `ContractionAxisMismatch` if a contracted pair of axes differs in
///   chunk structure
///
/// # Example
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
/// use blocktensors::contract::contract_blocksparse;
/// use blocktensors::Tensor;
///
/// // A: 5x6 with chunks [2,3] x [2,4]
/// let spaces_a = IndexSpaces::new(vec![
///     IndexSpace::new(vec![2, 3]).unwrap(),
///     IndexSpace::new(vec![2, 4]).unwrap(),
/// ]);
/// // B: 6x8 with chunks [2,4] x [3,5]
/// let spaces_b = IndexSpaces::new(vec![
///     IndexSpace::new(vec![2, 4]).unwrap(),
///     IndexSpace::new(vec![3, 5]).unwrap(),
/// ]);
/// let mut a: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], spaces_a).unwrap();
/// let mut b: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], spaces_b).unwrap();
/// a.insert_block(&BlockLabel::new(&[0, 0]), &Tensor::ones(&[2, 2])).unwrap();
/// a.insert_block(&BlockLabel::new(&[1, 1]), &Tensor::ones(&[3, 4])).unwrap();
/// b.insert_block(&BlockLabel::new(&[0, 0]), &Tensor::ones(&[2, 3])).unwrap();
/// b.insert_block(&BlockLabel::new(&[1, 1]), &Tensor::ones(&[4, 5])).unwrap();
///
/// // C[i,k] = A[i,j] * B[j,k]
/// let c = contract_blocksparse(&a, &[1, -1], &b, &[-1, 2]).unwrap();
/// assert_eq!(c.shape(), vec![5, 8]);
/// assert_eq!(c.nonzero_block_count(), 2);
/// assert_eq!(c.get(&[4, 7]).unwrap(), 4.0);
/// ```
pub fn contract_blocksparse<ElT: Scalar>(
    a: &BlockSparseTensor<ElT>,
    labels_a: &[i32],
    b: &BlockSparseTensor<ElT>,
    labels_b: &[i32],
) -> Result<BlockSparseTensor<ElT>, TensorError> {
    check_label_counts(labels_a, a.ndim(), labels_b, b.ndim())?;

    let props = ContractionProperties::compute(labels_a, &a.shape(), labels_b, &b.shape());
    for &(axis_a, axis_b) in &props.contracted_pairs {
        let (sa, sb) = (a.spaces().space(axis_a), b.spaces().space(axis_b));
        if !sa.same_structure(sb) {
            return Err(TensorError::ContractionAxisMismatch {
                axis_a,
                axis_b,
                chunks_a: sa.chunk_sizes().to_vec(),
                chunks_b: sb.chunk_sizes().to_vec(),
            });
        }
    }

    let contracted_a = props.contracted_a();
    let contracted_b = props.contracted_b();

    // B blocks grouped by contracted chunk tuple, canonical order within a group.
    let mut b_by_key: BTreeMap<ChunkKey, Vec<usize>> = BTreeMap::new();
    for (i, entry) in b.offsets().iter().enumerate() {
        b_by_key
            .entry(entry.label.select(&contracted_b))
            .or_default()
            .push(i);
    }

    let mut b_cache: HashMap<usize, Vec<ElT>> = HashMap::new();
    let mut accumulators: BTreeMap<BlockLabel, (usize, usize, Vec<ElT>)> = BTreeMap::new();
    let mut pairs = 0usize;

    for entry_a in a.offsets().iter() {
        let Some(partners) = b_by_key.get(&entry_a.label.select(&contracted_a)) else {
            continue;
        };
        let a_block = permuted_block(a.data(), entry_a, &props.perm_a, props.permute_a);
        let m: usize = props.uncontracted_a.iter().map(|&i| entry_a.shape[i]).product();
        let k: usize = contracted_a.iter().map(|&i| entry_a.shape[i]).product();

        for &ib in partners {
            let Some(entry_b) = b.offsets().entry(ib) else {
                continue;
            };
            let b_block: &[ElT] = b_cache
                .entry(ib)
                .or_insert_with(|| permuted_block(b.data(), entry_b, &props.perm_b, props.permute_b));
            let n: usize = props.uncontracted_b.iter().map(|&j| entry_b.shape[j]).product();

            let out_label = output_label(&entry_a.label, &entry_b.label, &props);
            let (_, _, acc) = accumulators
                .entry(out_label)
                .or_insert_with(|| (m, n, vec![ElT::zero(); m * n]));

            matmul(
                slice_as_mat_mut(acc.as_mut_slice(), m, n),
                Accum::Add,
                slice_as_mat(&a_block, m, k),
                slice_as_mat(b_block, k, n),
                ElT::one(),
                Par::Seq,
            );
            pairs += 1;
        }
    }

    debug!(
        "contract_blocksparse: {} x {} blocks, {} matching pairs -> {} output blocks",
        a.nonzero_block_count(),
        b.nonzero_block_count(),
        pairs,
        accumulators.len()
    );

    let spaces = output_spaces(a.spaces(), b.spaces(), &props)?;
    let mut labels = Vec::with_capacity(accumulators.len());
    let mut data = Vec::new();
    for (label, (_, _, block)) in accumulators {
        labels.push(label);
        data.extend(block);
    }
    let offsets = BlockOffsetTable::from_sorted(labels, &spaces);
    let result = BlockSparseTensor::from_parts(data, offsets, spaces)?;

    if props.permute_c {
        permutedims_blocksparse(&result, &props.perm_c)
    } else {
        Ok(result)
    }
}

/// Contract `a` and `b` over the paired axes `axes_a[p]` <-> `axes_b[p]`.
///
/// The output axes are the free axes of `a` followed by the free axes of
/// `b`, each in ascending original order.
///
/// # Errors
///
/// - `WrongNumberOfIndices` if the axis lists differ in length
/// - `InvalidAxisRange` for an out-of-range or repeated axis
/// - `ContractionAxisMismatch` as in [`contract_blocksparse`]
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
/// use blocktensors::contract::contract_axes;
///
/// let s = |v: Vec<usize>| IndexSpace::new(v).unwrap();
/// let a: BlockSparseTensor<f64> = BlockSparseTensor::zeros(
///     &[BlockLabel::new(&[0, 1, 0])],
///     IndexSpaces::new(vec![s(vec![2]), s(vec![1, 3]), s(vec![4])]),
/// ).unwrap();
/// let b: BlockSparseTensor<f64> = BlockSparseTensor::zeros(
///     &[BlockLabel::new(&[1, 0])],
///     IndexSpaces::new(vec![s(vec![1, 3]), s(vec![5])]),
/// ).unwrap();
///
/// let c = contract_axes(&a, &[1], &b, &[0]).unwrap();
/// assert_eq!(c.shape(), vec![2, 4, 5]);
/// ```
pub fn contract_axes<ElT: Scalar>(
    a: &BlockSparseTensor<ElT>,
    axes_a: &[usize],
    b: &BlockSparseTensor<ElT>,
    axes_b: &[usize],
) -> Result<BlockSparseTensor<ElT>, TensorError> {
    if axes_a.len() != axes_b.len() {
        return Err(TensorError::WrongNumberOfIndices {
            expected: axes_a.len(),
            actual: axes_b.len(),
        });
    }
    let labels_a = axis_labels(axes_a, a.ndim(), 1)?;
    let free_a = labels_a.iter().filter(|&&l| l > 0).count() as i32;
    let labels_b = axis_labels(axes_b, b.ndim(), free_a + 1)?;
    contract_blocksparse(a, &labels_a, b, &labels_b)
}

/// Labels for one tensor: `axes[p]` gets `-(p + 1)`, the remaining axes get
/// consecutive positive labels starting at `first_free`.
fn axis_labels(axes: &[usize], ndim: usize, first_free: i32) -> Result<Vec<i32>, TensorError> {
    let mut labels = vec![0i32; ndim];
    for (p, &axis) in axes.iter().enumerate() {
        if axis >= ndim || labels[axis] != 0 {
            return Err(TensorError::InvalidAxisRange {
                start: axis,
                end: axis + 1,
                ndim,
            });
        }
        labels[axis] = -(p as i32 + 1);
    }
    let mut next = first_free;
    for label in labels.iter_mut().filter(|l| **l == 0) {
        *label = next;
        next += 1;
    }
    Ok(labels)
}

/// Block data reordered for GEMM.
fn permuted_block<ElT: Scalar>(arena: &[ElT], entry: &BlockEntry, perm: &[usize], permute: bool) -> Vec<ElT> {
    let src = &arena[entry.range()];
    if !permute {
        return src.to_vec();
    }
    let mut dest = vec![ElT::zero(); src.len()];
    GenericBackend::permute_into(&mut dest, src, &entry.shape, perm);
    dest
}

/// Output label before `perm_c`: free chunks of A then free chunks of B.
fn output_label(label_a: &BlockLabel, label_b: &BlockLabel, props: &ContractionProperties) -> BlockLabel {
    if props.is_full_contraction() {
        return BlockLabel::new(&[0]);
    }
    BlockLabel::collect_from(
        props
            .uncontracted_a
            .iter()
            .map(|&i| label_a[i])
            .chain(props.uncontracted_b.iter().map(|&j| label_b[j])),
    )
}

/// Output index spaces before `perm_c`.
fn output_spaces(
    spaces_a: &IndexSpaces,
    spaces_b: &IndexSpaces,
    props: &ContractionProperties,
) -> Result<IndexSpaces, TensorError> {
    if props.is_full_contraction() {
        return Ok(IndexSpaces::new(vec![IndexSpace::trivial(1)?]));
    }
    Ok(IndexSpaces::new(
        props
            .uncontracted_a
            .iter()
            .map(|&i| spaces_a.space(i).clone())
            .chain(props.uncontracted_b.iter().map(|&j| spaces_b.space(j).clone()))
            .collect(),
    ))
}
