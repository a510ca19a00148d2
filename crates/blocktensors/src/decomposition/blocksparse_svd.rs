//! Block SVD of block-sparse tensors.
//!
//! The tensor is permuted and combined into a matrix `(R, C)`. Chunks of `R`
//! and `C` are grouped into sectors (by QN when the axes carry QNs,
//! otherwise one sector per chunk); a block-diagonal input pairs every row
//! sector with exactly one column sector. Each sector is decomposed with one
//! dense faer SVD, truncation runs on the pooled spectrum, and the factors
//! are scattered back per chunk and split into the original axes.

use std::collections::BTreeMap;

use faer::Mat;
use faer::linalg::solvers::{Svd, SvdError};
use log::debug;

use crate::blocksparse_tensor::BlockSparseTensor;
use crate::decomposition::truncation::TruncationParams;
use crate::error::TensorError;
use crate::operations::{combine_axes, permutedims_blocksparse, split_axis, validate_permutation};
use crate::scalar::Scalar;
use crate::storage::blocksparse::{BlockLabel, BlockOffsetTable, IndexSpace, IndexSpaces, Qn};

/// Result of [`svd_blocksparse`].
///
/// `A = U * S * V^H`, contracting `U`'s link with `S`'s first axis and
/// `S`'s second axis with the link of `conj(V)`.
#[derive(Debug, Clone)]
pub struct BlockSvdResult<ElT: Scalar> {
    /// Axes `[row axes..., link]`.
    pub u: BlockSparseTensor<ElT>,
    /// Axes `[link, link]`, diagonal blocks only.
    pub s: BlockSparseTensor<ElT>,
    /// Axes `[col axes..., link]`.
    pub v: BlockSparseTensor<ElT>,
    /// Kept singular values per link chunk, descending.
    pub spectrum: Vec<Vec<f64>>,
    /// Discarded squared weight, see [`TruncationParams`].
    pub truncation_error: f64,
}

impl<ElT: Scalar> BlockSvdResult<ElT> {
    /// Total number of kept singular values.
    pub fn rank(&self) -> usize {
        self.spectrum.iter().map(Vec::len).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SectorKey {
    Charge(Qn),
    Chunk(usize),
}

fn sector_key(space: &IndexSpace, chunk: usize) -> SectorKey {
    match space.qn(chunk) {
        Some(qn) => SectorKey::Charge(qn.clone()),
        None => SectorKey::Chunk(chunk),
    }
}

/// Chunks of one side of a sector with their offsets into the sector matrix.
#[derive(Debug, Default)]
struct SectorSide {
    chunks: BTreeMap<usize, usize>,
}

impl SectorSide {
    fn insert(&mut self, chunk: usize) {
        self.chunks.entry(chunk).or_insert(0);
    }

    /// Assign offsets in chunk order; returns the total extent.
    fn layout(&mut self, space: &IndexSpace) -> usize {
        let mut extent = 0;
        for (&chunk, offset) in self.chunks.iter_mut() {
            *offset = extent;
            extent += space.chunk_size(chunk);
        }
        extent
    }
}

#[derive(Debug)]
struct Sector {
    col_key: SectorKey,
    rows: SectorSide,
    cols: SectorSide,
    blocks: Vec<usize>,
    qn: Option<Qn>,
}

struct SectorFactors<ElT: Scalar> {
    u: Mat<ElT>,
    v: Mat<ElT>,
    values: Vec<f64>,
}

/// SVD of a block-sparse tensor with `row_axes` on the left and `col_axes`
/// on the right.
///
/// # Errors
///
/// - `InvalidPermutation` unless the two groups are non-empty and together
///   name every axis once
/// - `NonBlockDiagonalInput` if a row sector meets more than one column
///   sector or vice versa
/// - `SvdError` if the tensor has no present blocks, truncation keeps no
///   value at all (possible with `min_rank == 0`), or faer fails
///
/// # Example
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
/// use blocktensors::decomposition::{TruncationParams, svd_blocksparse};
///
/// let spaces = IndexSpaces::new(vec![
///     IndexSpace::new(vec![2, 3]).unwrap(),
///     IndexSpace::new(vec![4, 2]).unwrap(),
/// ]);
/// let mut t: BlockSparseTensor<f64> = BlockSparseTensor::zeros(
///     &[BlockLabel::new(&[0, 1]), BlockLabel::new(&[1, 0])],
///     spaces,
/// ).unwrap();
/// t.data_mut().iter_mut().enumerate().for_each(|(i, x)| *x = i as f64);
///
/// let result = svd_blocksparse(&t, &[0], &[1], &TruncationParams::default()).unwrap();
/// assert_eq!(result.u.nonzero_block_count(), 2);
/// assert_eq!(result.s.nonzero_block_count(), 2);
/// assert_eq!(result.v.nonzero_block_count(), 2);
/// ```
pub fn svd_blocksparse<ElT: Scalar>(
    tensor: &BlockSparseTensor<ElT>,
    row_axes: &[usize],
    col_axes: &[usize],
    params: &TruncationParams,
) -> Result<BlockSvdResult<ElT>, TensorError> {
    let perm: Vec<usize> = row_axes.iter().chain(col_axes).copied().collect();
    validate_permutation(&perm, tensor.ndim())?;
    if row_axes.is_empty() || col_axes.is_empty() {
        return Err(TensorError::InvalidPermutation {
            perm,
            ndim: tensor.ndim(),
        });
    }
    if tensor.nonzero_block_count() == 0 {
        return Err(TensorError::SvdError {
            message: "tensor has no present blocks".to_string(),
        });
    }

    let permuted = permutedims_blocksparse(tensor, &perm)?;
    let row_spaces: Vec<IndexSpace> = row_axes.iter().map(|&a| tensor.spaces()[a].clone()).collect();
    let col_spaces: Vec<IndexSpace> = col_axes.iter().map(|&a| tensor.spaces()[a].clone()).collect();
    let matrix = combine_axes(&combine_axes(&permuted, 0, row_axes.len())?, 1, col_axes.len())?;
    let (row_space, col_space) = (&matrix.spaces()[0], &matrix.spaces()[1]);

    let mut sectors = group_sectors(&matrix)?;
    let factors = sectors
        .values_mut()
        .map(|sector| decompose_sector(&matrix, sector))
        .collect::<Result<Vec<_>, _>>()?;

    // Pool (value, sector) in sector order, each spectrum descending; the
    // stable sort keeps that order among equal values.
    let mut pooled: Vec<(f64, usize)> = factors
        .iter()
        .enumerate()
        .flat_map(|(k, f)| f.values.iter().map(move |&s| (s, k)))
        .collect();
    pooled.sort_by(|x, y| y.0.total_cmp(&x.0));
    let sorted: Vec<f64> = pooled.iter().map(|&(s, _)| s).collect();
    let (keep, truncation_error) = params.kept_count(&sorted);

    let mut ranks = vec![0usize; factors.len()];
    for &(_, k) in &pooled[..keep] {
        ranks[k] += 1;
    }

    // Link chunks: one per sector that keeps at least one value.
    let kept: Vec<usize> = (0..factors.len()).filter(|&k| ranks[k] > 0).collect();
    if kept.is_empty() {
        return Err(TensorError::SvdError {
            message: "truncation removed every singular value".to_string(),
        });
    }
    let sector_list: Vec<&Sector> = sectors.values().collect();
    let link_sizes: Vec<usize> = kept.iter().map(|&k| ranks[k]).collect();
    let link = if row_space.has_qns() {
        let qns = kept
            .iter()
            .map(|&k| sector_list[k].qn.clone().unwrap_or_default())
            .collect();
        IndexSpace::with_qns(link_sizes, qns)?
    } else {
        IndexSpace::new(link_sizes)?
    };

    let mut u_blocks = Vec::new();
    let mut v_blocks = Vec::new();
    let mut s_blocks = Vec::new();
    let mut spectrum = Vec::with_capacity(kept.len());
    for (l, &k) in kept.iter().enumerate() {
        let (sector, f, rank) = (sector_list[k], &factors[k], ranks[k]);
        for (&chunk, &offset) in &sector.rows.chunks {
            u_blocks.push((
                BlockLabel::new(&[chunk, l]),
                leading_columns(&f.u, offset, row_space.chunk_size(chunk), rank),
            ));
        }
        for (&chunk, &offset) in &sector.cols.chunks {
            v_blocks.push((
                BlockLabel::new(&[chunk, l]),
                leading_columns(&f.v, offset, col_space.chunk_size(chunk), rank),
            ));
        }
        let mut diag = vec![ElT::zero(); rank * rank];
        for (i, &s) in f.values[..rank].iter().enumerate() {
            diag[i * rank + i] = ElT::from_real(s);
        }
        s_blocks.push((BlockLabel::new(&[l, l]), diag));
        spectrum.push(f.values[..rank].to_vec());
    }

    debug!(
        "svd_blocksparse: {} blocks in {} sectors, kept {} of {} values in {} sectors (error {:e})",
        matrix.nonzero_block_count(),
        factors.len(),
        keep,
        sorted.len(),
        kept.len(),
        truncation_error
    );

    let u = assemble(u_blocks, IndexSpaces::new(vec![row_space.clone(), link.clone()]))?;
    let v = assemble(v_blocks, IndexSpaces::new(vec![col_space.clone(), link.clone()]))?;
    let s = assemble(s_blocks, IndexSpaces::new(vec![link.clone(), link]))?;

    Ok(BlockSvdResult {
        u: split_axis(&u, 0, &row_spaces)?,
        s,
        v: split_axis(&v, 0, &col_spaces)?,
        spectrum,
        truncation_error,
    })
}

/// Group the blocks of a matrix by row sector, checking the one-to-one
/// pairing of row and column sectors.
fn group_sectors<ElT: Scalar>(
    matrix: &BlockSparseTensor<ElT>,
) -> Result<BTreeMap<SectorKey, Sector>, TensorError> {
    let (row_space, col_space) = (&matrix.spaces()[0], &matrix.spaces()[1]);
    let mut sectors: BTreeMap<SectorKey, Sector> = BTreeMap::new();
    let mut col_owner: BTreeMap<SectorKey, SectorKey> = BTreeMap::new();

    for (i, entry) in matrix.offsets().iter().enumerate() {
        let (r, c) = (entry.label[0], entry.label[1]);
        let row_key = sector_key(row_space, r);
        let col_key = sector_key(col_space, c);

        let owner = col_owner.entry(col_key.clone()).or_insert_with(|| row_key.clone());
        if *owner != row_key {
            return Err(TensorError::NonBlockDiagonalInput {
                message: format!("column chunk {} meets row sectors {:?} and {:?}", c, owner, row_key),
            });
        }
        let sector = sectors.entry(row_key).or_insert_with(|| Sector {
            col_key: col_key.clone(),
            rows: SectorSide::default(),
            cols: SectorSide::default(),
            blocks: Vec::new(),
            qn: row_space.qn(r).cloned(),
        });
        if sector.col_key != col_key {
            return Err(TensorError::NonBlockDiagonalInput {
                message: format!(
                    "row chunk {} meets column sectors {:?} and {:?}",
                    r, sector.col_key, col_key
                ),
            });
        }
        sector.rows.insert(r);
        sector.cols.insert(c);
        sector.blocks.push(i);
    }
    Ok(sectors)
}

/// Gather a sector into one dense matrix and decompose it.
fn decompose_sector<ElT: Scalar>(
    matrix: &BlockSparseTensor<ElT>,
    sector: &mut Sector,
) -> Result<SectorFactors<ElT>, TensorError> {
    let (row_space, col_space) = (&matrix.spaces()[0], &matrix.spaces()[1]);
    let m = sector.rows.layout(row_space);
    let n = sector.cols.layout(col_space);

    let mut dense = Mat::<ElT>::zeros(m, n);
    for &i in &sector.blocks {
        let Some(entry) = matrix.offsets().entry(i) else {
            continue;
        };
        let (r, c) = (entry.label[0], entry.label[1]);
        let (ro, co) = (sector.rows.chunks[&r], sector.cols.chunks[&c]);
        let rows = entry.shape[0];
        for (idx, &x) in matrix.data()[entry.range()].iter().enumerate() {
            dense[(ro + idx % rows, co + idx / rows)] = x;
        }
    }

    let svd: Svd<ElT> = Svd::new_thin(dense.as_ref()).map_err(|e: SvdError| TensorError::SvdError {
        message: format!("{:?}", e),
    })?;
    let s_diag = svd.S();
    let values = (0..m.min(n)).map(|k| s_diag[k].real_part()).collect();

    Ok(SectorFactors {
        u: svd.U().to_owned(),
        v: svd.V().to_owned(),
        values,
    })
}

/// Rows `offset..offset + rows` and the first `rank` columns, column-major.
fn leading_columns<ElT: Scalar>(mat: &Mat<ElT>, offset: usize, rows: usize, rank: usize) -> Vec<ElT> {
    let mut data = Vec::with_capacity(rows * rank);
    for j in 0..rank {
        for i in 0..rows {
            data.push(mat[(offset + i, j)]);
        }
    }
    data
}

/// Build a two-axis tensor from labeled blocks in any order.
fn assemble<ElT: Scalar>(
    mut blocks: Vec<(BlockLabel, Vec<ElT>)>,
    spaces: IndexSpaces,
) -> Result<BlockSparseTensor<ElT>, TensorError> {
    blocks.sort_by(|x, y| x.0.cmp(&y.0));
    let mut labels = Vec::with_capacity(blocks.len());
    let mut data = Vec::new();
    for (label, block) in blocks {
        labels.push(label);
        data.extend(block);
    }
    let offsets = BlockOffsetTable::from_sorted(labels, &spaces);
    BlockSparseTensor::from_parts(data, offsets, spaces)
}
