//! BlockSparse storage: one arena for all present blocks.

use log::trace;

use super::block_label::BlockLabel;
use super::block_offsets::{BlockEntry, BlockOffsetTable};
use super::index_space::IndexSpaces;
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::storage::Dense;

/// Block-sparse storage for tensors.
///
/// Present blocks are stored back to back in a single `Dense` arena in
/// canonical label order; each block is column-major internally.
///
/// # Example
///
/// ```
/// use blocktensors::storage::blocksparse::{BlockLabel, BlockSparse, IndexSpace, IndexSpaces};
///
/// let spaces = IndexSpaces::new(vec![
///     IndexSpace::new(vec![2, 3]).unwrap(),
///     IndexSpace::new(vec![4, 5]).unwrap(),
/// ]);
/// let labels = vec![BlockLabel::new(&[0, 0]), BlockLabel::new(&[1, 1])];
/// let storage: BlockSparse<f64> = BlockSparse::zeros(&labels, spaces).unwrap();
///
/// assert_eq!(storage.nnzblocks(), 2);
/// assert_eq!(storage.nnz(), 8 + 15);
/// ```
#[derive(Clone, Debug)]
pub struct BlockSparse<ElT: Scalar> {
    data: Dense<ElT>,
    offsets: BlockOffsetTable,
    spaces: IndexSpaces,
}

impl<ElT: Scalar> BlockSparse<ElT> {
    /// Zero-filled storage for the given blocks.
    ///
    /// # Errors
    ///
    /// `InvalidBlockLabel` / `WrongNumberOfIndices` for labels that do not fit
    /// `spaces`.
    pub fn zeros(labels: &[BlockLabel], spaces: IndexSpaces) -> Result<Self, TensorError> {
        let offsets = BlockOffsetTable::from_blocks(labels, &spaces)?;
        Ok(Self {
            data: Dense::zeros(offsets.total_nonzero_elements()),
            offsets,
            spaces,
        })
    }

    /// Assemble storage from an arena laid out according to `offsets`.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the arena length differs from the table's total.
    pub fn from_parts(
        data: Vec<ElT>,
        offsets: BlockOffsetTable,
        spaces: IndexSpaces,
    ) -> Result<Self, TensorError> {
        if data.len() != offsets.total_nonzero_elements() {
            return Err(TensorError::ShapeMismatch {
                expected: offsets.total_nonzero_elements(),
                actual: data.len(),
            });
        }
        Ok(Self {
            data: Dense::from_vec(data),
            offsets,
            spaces,
        })
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.spaces.ndims()
    }

    /// Dense shape.
    pub fn shape(&self) -> Vec<usize> {
        self.spaces.dense_shape()
    }

    /// Number of stored elements.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.offsets.total_nonzero_elements()
    }

    /// Number of stored blocks.
    #[inline]
    pub fn nnzblocks(&self) -> usize {
        self.offsets.nonzero_block_count()
    }

    #[inline]
    pub fn spaces(&self) -> &IndexSpaces {
        &self.spaces
    }

    #[inline]
    pub fn offsets(&self) -> &BlockOffsetTable {
        &self.offsets
    }

    #[inline]
    pub fn is_present(&self, label: &BlockLabel) -> bool {
        self.offsets.present(label)
    }

    /// Data of a stored block.
    pub fn block_data(&self, label: &BlockLabel) -> Option<&[ElT]> {
        let entry = self.offsets.entry_for(label)?;
        Some(&self.data.as_slice()[entry.range()])
    }

    /// Mutable data of a stored block.
    pub fn block_data_mut(&mut self, label: &BlockLabel) -> Option<&mut [ElT]> {
        let range = self.offsets.entry_for(label)?.range();
        Some(&mut self.data.as_mut_slice()[range])
    }

    /// Make `label` present, zero-filled, if it is not already.
    ///
    /// The block is spliced into the arena at its canonical position, so
    /// later blocks shift up. Returns `true` if a block was created.
    ///
    /// # Errors
    ///
    /// `InvalidBlockLabel` / `WrongNumberOfIndices` for an out-of-range label.
    pub fn materialize(&mut self, label: &BlockLabel) -> Result<bool, TensorError> {
        match self.offsets.insert(label, &self.spaces)? {
            Some(range) => {
                trace!(
                    "materialized block {} ({} elements at offset {})",
                    label,
                    range.len(),
                    range.start
                );
                self.data.splice_zeros(range.start, range.len());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[ElT] {
        self.data.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [ElT] {
        self.data.as_mut_slice()
    }

    /// Split into arena, offset table and index spaces.
    pub fn into_parts(self) -> (Vec<ElT>, BlockOffsetTable, IndexSpaces) {
        (self.data.into_vec(), self.offsets, self.spaces)
    }

    /// Present blocks with their data, in canonical order.
    pub fn iter_blocks(&self) -> impl Iterator<Item = (&BlockEntry, &[ElT])> {
        let data = self.data.as_slice();
        self.offsets.iter().map(move |e| (e, &data[e.range()]))
    }
}

impl<ElT: Scalar> PartialEq for BlockSparse<ElT> {
    /// Equal spaces, equal present-block sets and equal data.
    ///
    /// Layout is canonical, so comparing arenas compares block by block.
    fn eq(&self, other: &Self) -> bool {
        self.spaces == other.spaces
            && self.offsets == other.offsets
            && self.data.as_slice() == other.data.as_slice()
    }
}

impl<ElT: Scalar> std::fmt::Display for BlockSparse<ElT> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BlockSparse(shape={:?}, nnzblocks={}, nnz={})",
            self.shape(),
            self.nnzblocks(),
            self.nnz()
        )
    }
}
