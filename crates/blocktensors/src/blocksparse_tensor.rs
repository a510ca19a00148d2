//! BlockSparseTensor - tensor over a block-sparse arena.
//!
//! `BlockSparseTensor` is a standalone struct rather than
//! `Tensor<ElT, BlockSparse>`: elements of absent blocks read as zero and
//! writing into them grows the arena, which does not fit the flat
//! `TensorStorage` contract.

use log::debug;

use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::storage::blocksparse::{BlockLabel, BlockOffsetTable, BlockSparse, IndexSpaces, Qn};
use crate::strides::{cartesian_to_linear, compute_strides, row_major_cartesian};
use crate::tensor::{DenseTensor, Tensor};

/// A block-sparse tensor.
///
/// Stores only present blocks; every other element is structurally zero.
///
/// # Example
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
///
/// let spaces = IndexSpaces::new(vec![
///     IndexSpace::new(vec![2, 3]).unwrap(),
///     IndexSpace::new(vec![4, 5]).unwrap(),
/// ]);
///
/// let mut tensor: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], spaces).unwrap();
/// tensor.set(&[0, 0], 1.5).unwrap();
/// tensor.set(&[4, 8], 2.5).unwrap();
///
/// assert_eq!(tensor.shape(), vec![5, 9]);
/// assert_eq!(tensor.nonzero_block_count(), 2);
/// assert_eq!(tensor.nonzero_element_count(), 8 + 15);
/// assert_eq!(tensor.get(&[0, 5]).unwrap(), 0.0);
/// assert!(tensor.is_block_present(&BlockLabel::new(&[1, 1])));
/// ```
#[derive(Clone, Debug)]
pub struct BlockSparseTensor<ElT: Scalar> {
    storage: BlockSparse<ElT>,
}

/// Read-only view of one present block.
///
/// `data` is the block's column-major slice of the arena.
#[derive(Clone, Copy, Debug)]
pub struct BlockView<'a, ElT: Scalar> {
    pub label: &'a BlockLabel,
    pub shape: &'a [usize],
    pub data: &'a [ElT],
}

impl<ElT: Scalar> BlockView<'_, ElT> {
    /// Element at an intra-block coordinate.
    pub fn get(&self, indices: &[usize]) -> Option<&ElT> {
        let linear = crate::strides::checked_linear_index(indices, self.shape).ok()?;
        self.data.get(linear)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy into an owned dense tensor.
    pub fn to_dense(&self) -> DenseTensor<ElT> {
        Tensor::from_block_data(self.data.to_vec(), self.shape)
    }
}

/// Mutable view of one present block; writes land in the tensor's arena.
#[derive(Debug)]
pub struct BlockViewMut<'a, ElT: Scalar> {
    pub shape: Vec<usize>,
    pub data: &'a mut [ElT],
}

impl<ElT: Scalar> BlockViewMut<'_, ElT> {
    /// Overwrite the element at an intra-block coordinate.
    ///
    /// # Errors
    ///
    /// `WrongNumberOfIndices` or `IndexOutOfBounds` for a bad coordinate.
    pub fn set(&mut self, indices: &[usize], value: ElT) -> Result<(), TensorError> {
        let linear = crate::strides::checked_linear_index(indices, &self.shape)?;
        self.data[linear] = value;
        Ok(())
    }

    pub fn get(&self, indices: &[usize]) -> Option<&ElT> {
        let linear = crate::strides::checked_linear_index(indices, &self.shape).ok()?;
        self.data.get(linear)
    }

    pub fn fill(&mut self, value: ElT) {
        self.data.fill(value);
    }
}

impl<ElT: Scalar> BlockSparseTensor<ElT> {
    /// Zero-filled tensor with the given present blocks.
    ///
    /// # Errors
    ///
    /// `InvalidBlockLabel` if a label does not fit `spaces`.
    pub fn zeros(labels: &[BlockLabel], spaces: IndexSpaces) -> Result<Self, TensorError> {
        Ok(Self {
            storage: BlockSparse::zeros(labels, spaces)?,
        })
    }

    /// Zero-filled tensor holding every block whose total charge is `flux`.
    ///
    /// # Errors
    ///
    /// `InvalidIndexSpace` unless every axis carries QNs.
    ///
    /// ```
    /// use blocktensors::BlockSparseTensor;
    /// use blocktensors::storage::blocksparse::{IndexSpace, IndexSpaces, Qn};
    ///
    /// let site = IndexSpace::with_qns(vec![1, 1], vec![Qn::new(&[1]), Qn::new(&[-1])]).unwrap();
    /// let dual = IndexSpace::with_qns(vec![1, 1], vec![Qn::new(&[-1]), Qn::new(&[1])]).unwrap();
    /// let t: BlockSparseTensor<f64> =
    ///     BlockSparseTensor::zeros_with_flux(IndexSpaces::new(vec![site, dual]), &Qn::zero()).unwrap();
    ///
    /// // Only (0,0) and (1,1) conserve charge
    /// assert_eq!(t.nonzero_block_count(), 2);
    /// ```
    pub fn zeros_with_flux(spaces: IndexSpaces, flux: &Qn) -> Result<Self, TensorError> {
        if !spaces.iter().all(|s| s.has_qns()) {
            return Err(TensorError::InvalidIndexSpace {
                message: "flux selection needs QN labels on every axis".to_string(),
            });
        }
        let extents = spaces.nchunks();
        let count: usize = extents.iter().product();
        // Row-major enumeration is already canonical order.
        let labels: Vec<BlockLabel> = (0..count)
            .map(|linear| BlockLabel::from(row_major_cartesian(linear, &extents)))
            .filter(|label| spaces.block_flux(label).as_ref() == Some(flux))
            .collect();
        debug!(
            "zeros_with_flux: {} of {} blocks carry flux {}",
            labels.len(),
            count,
            flux
        );
        let offsets = BlockOffsetTable::from_sorted(labels, &spaces);
        Ok(Self {
            storage: BlockSparse::from_parts(
                vec![ElT::zero(); offsets.total_nonzero_elements()],
                offsets,
                spaces,
            )?,
        })
    }

    pub fn from_storage(storage: BlockSparse<ElT>) -> Self {
        Self { storage }
    }

    /// Assemble from an arena laid out by `offsets`.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if `data` does not match the table's element count.
    pub fn from_parts(
        data: Vec<ElT>,
        offsets: BlockOffsetTable,
        spaces: IndexSpaces,
    ) -> Result<Self, TensorError> {
        Ok(Self {
            storage: BlockSparse::from_parts(data, offsets, spaces)?,
        })
    }

    /// Dense shape.
    pub fn shape(&self) -> Vec<usize> {
        self.storage.shape()
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.storage.ndim()
    }

    #[inline]
    pub fn nonzero_element_count(&self) -> usize {
        self.storage.nnz()
    }

    #[inline]
    pub fn nonzero_block_count(&self) -> usize {
        self.storage.nnzblocks()
    }

    #[inline]
    pub fn spaces(&self) -> &IndexSpaces {
        self.storage.spaces()
    }

    #[inline]
    pub fn offsets(&self) -> &BlockOffsetTable {
        self.storage.offsets()
    }

    #[inline]
    pub fn storage(&self) -> &BlockSparse<ElT> {
        &self.storage
    }

    pub fn into_storage(self) -> BlockSparse<ElT> {
        self.storage
    }

    /// The arena, blocks back to back in canonical order.
    #[inline]
    pub fn data(&self) -> &[ElT] {
        self.storage.as_slice()
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [ElT] {
        self.storage.as_mut_slice()
    }

    #[inline]
    pub fn is_block_present(&self, label: &BlockLabel) -> bool {
        self.storage.is_present(label)
    }

    /// Total charge of a block, if every axis carries QNs.
    pub fn block_flux(&self, label: &BlockLabel) -> Option<Qn> {
        self.spaces().block_flux(label)
    }

    /// Map a global coordinate to its block label and intra-block coordinate.
    fn locate(&self, indices: &[usize]) -> Result<(BlockLabel, Vec<usize>), TensorError> {
        let spaces = self.spaces();
        if indices.len() != spaces.ndims() {
            return Err(TensorError::WrongNumberOfIndices {
                expected: spaces.ndims(),
                actual: indices.len(),
            });
        }
        let mut chunks = Vec::with_capacity(indices.len());
        let mut local = Vec::with_capacity(indices.len());
        for (space, &index) in spaces.iter().zip(indices) {
            let (chunk, offset) =
                space
                    .locate(index)
                    .ok_or(TensorError::IndexOutOfBounds {
                        index,
                        dim_size: space.dim(),
                    })?;
            chunks.push(chunk);
            local.push(offset);
        }
        Ok((BlockLabel::from(chunks), local))
    }

    /// Element at a global coordinate; zero inside an absent block.
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds` if a coordinate exceeds its axis, or
    /// `WrongNumberOfIndices` for the wrong rank.
    pub fn get(&self, indices: &[usize]) -> Result<ElT, TensorError> {
        let (label, local) = self.locate(indices)?;
        match self.storage.offsets().entry_for(&label) {
            Some(entry) => {
                let linear = cartesian_to_linear(&local, &compute_strides(&entry.shape));
                Ok(self.storage.as_slice()[entry.offset + linear])
            }
            None => Ok(ElT::zero()),
        }
    }

    /// Write an element, materializing its block first if it is absent.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    pub fn set(&mut self, indices: &[usize], value: ElT) -> Result<(), TensorError> {
        let (label, local) = self.locate(indices)?;
        self.storage.materialize(&label)?;
        let entry = self
            .storage
            .offsets()
            .entry_for(&label)
            .ok_or_else(|| TensorError::BlockNotFound {
                block: label.coords().to_vec(),
            })?;
        let position = entry.offset + cartesian_to_linear(&local, &compute_strides(&entry.shape));
        self.storage.as_mut_slice()[position] = value;
        Ok(())
    }

    /// Make a block present (zero-filled) without writing to it.
    ///
    /// Returns `true` if the block was created.
    pub fn materialize_block(&mut self, label: &BlockLabel) -> Result<bool, TensorError> {
        self.storage.materialize(label)
    }

    /// View of a present block, or `None` if it is structurally zero.
    pub fn block_view(&self, label: &BlockLabel) -> Option<BlockView<'_, ElT>> {
        let entry = self.storage.offsets().entry_for(label)?;
        Some(BlockView {
            label: &entry.label,
            shape: &entry.shape,
            data: &self.storage.as_slice()[entry.range()],
        })
    }

    /// Mutable view of a present block.
    ///
    /// ```
    /// use blocktensors::BlockSparseTensor;
    /// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
    ///
    /// let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![2, 3]).unwrap()]);
    /// let label = BlockLabel::new(&[1]);
    /// let mut t: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[label.clone()], spaces).unwrap();
    ///
    /// t.block_view_mut(&label).unwrap().set(&[2], 7.0).unwrap();
    /// assert_eq!(t.get(&[4]).unwrap(), 7.0);
    /// ```
    pub fn block_view_mut(&mut self, label: &BlockLabel) -> Option<BlockViewMut<'_, ElT>> {
        let shape = self.storage.offsets().entry_for(label)?.shape.clone();
        let data = self.storage.block_data_mut(label)?;
        Some(BlockViewMut { shape, data })
    }

    /// Owned copy of a present block.
    pub fn blockview(&self, label: &BlockLabel) -> Option<DenseTensor<ElT>> {
        self.block_view(label).map(|view| view.to_dense())
    }

    /// Copy `data` into the block at `label`, materializing it if needed.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if `data` does not have the block's shape,
    /// `InvalidBlockLabel` for an out-of-range label.
    pub fn insert_block(
        &mut self,
        label: &BlockLabel,
        data: &DenseTensor<ElT>,
    ) -> Result<(), TensorError> {
        self.spaces().validate_label(label)?;
        let block_shape = self.spaces().block_shape(label);
        if data.shape() != block_shape.as_slice() {
            return Err(TensorError::ShapeMismatch {
                expected: block_shape.iter().product(),
                actual: data.len(),
            });
        }
        self.storage.materialize(label)?;
        let dest = self
            .storage
            .block_data_mut(label)
            .ok_or_else(|| TensorError::BlockNotFound {
                block: label.coords().to_vec(),
            })?;
        dest.copy_from_slice(data.data());
        Ok(())
    }

    /// Present blocks in canonical order.
    pub fn iter_blocks(&self) -> impl Iterator<Item = BlockView<'_, ElT>> {
        self.storage
            .iter_blocks()
            .map(|(entry, data)| BlockView {
                label: &entry.label,
                shape: &entry.shape,
                data,
            })
    }

    /// Fully expanded dense tensor with zeros in absent blocks.
    ///
    /// ```
    /// use blocktensors::BlockSparseTensor;
    /// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
    /// use blocktensors::Tensor;
    ///
    /// let spaces = IndexSpaces::new(vec![
    ///     IndexSpace::new(vec![2, 3]).unwrap(),
    ///     IndexSpace::new(vec![4, 5]).unwrap(),
    /// ]);
    /// let label = BlockLabel::new(&[1, 1]);
    /// let mut bst: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], spaces).unwrap();
    /// bst.insert_block(&label, &Tensor::ones(&[3, 5])).unwrap();
    ///
    /// let dense = bst.to_dense();
    /// assert_eq!(dense.shape(), &[5, 9]);
    /// assert_eq!(dense.get(&[2, 4]), Some(&1.0));
    /// assert_eq!(dense.get(&[0, 0]), Some(&0.0));
    /// ```
    pub fn to_dense(&self) -> DenseTensor<ElT> {
        let shape = self.shape();
        let mut dense: DenseTensor<ElT> = Tensor::zeros(&shape);
        let strides = compute_strides(&shape);
        let spaces = self.spaces();

        for view in self.iter_blocks() {
            let start = spaces.block_start(view.label);
            let out = dense.data_mut();
            for_each_block_element(view.shape, &start, &strides, |block_linear, dense_linear| {
                out[dense_linear] = view.data[block_linear];
            });
        }
        dense
    }

    /// Extract the named blocks of a dense tensor.
    ///
    /// Elements outside those blocks are dropped.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the dense shape differs from `spaces`, or
    /// `InvalidBlockLabel` for a bad label.
    pub fn from_dense(
        dense: &DenseTensor<ElT>,
        spaces: IndexSpaces,
        labels: &[BlockLabel],
    ) -> Result<Self, TensorError> {
        let expected_shape = spaces.dense_shape();
        if dense.shape() != expected_shape.as_slice() {
            return Err(TensorError::ShapeMismatch {
                expected: expected_shape.iter().product(),
                actual: dense.len(),
            });
        }

        let mut result = Self::zeros(labels, spaces)?;
        let strides = compute_strides(dense.shape());
        let src = dense.data();
        let starts: Vec<(usize, Vec<usize>, Vec<usize>)> = result
            .offsets()
            .iter()
            .map(|e| (e.offset, e.shape.clone(), result.spaces().block_start(&e.label)))
            .collect();
        let arena = result.data_mut();
        for (offset, shape, start) in starts {
            for_each_block_element(&shape, &start, &strides, |block_linear, dense_linear| {
                arena[offset + block_linear] = src[dense_linear];
            });
        }
        Ok(result)
    }
}

/// Visit every element of a block placed at `start` inside a dense array.
///
/// Calls `f(block_linear, dense_linear)` in block column-major order.
fn for_each_block_element<F>(block_shape: &[usize], start: &[usize], dense_strides: &[usize], mut f: F)
where
    F: FnMut(usize, usize),
{
    let len: usize = block_shape.iter().product();
    if len == 0 {
        return;
    }
    let mut index = vec![0usize; block_shape.len()];
    let mut dense_linear: usize = start
        .iter()
        .zip(dense_strides)
        .map(|(&s, &stride)| s * stride)
        .sum();

    for block_linear in 0..len {
        f(block_linear, dense_linear);
        for axis in 0..block_shape.len() {
            index[axis] += 1;
            dense_linear += dense_strides[axis];
            if index[axis] < block_shape[axis] {
                break;
            }
            dense_linear -= dense_strides[axis] * block_shape[axis];
            index[axis] = 0;
        }
    }
}

impl<ElT: Scalar> PartialEq for BlockSparseTensor<ElT> {
    fn eq(&self, other: &Self) -> bool {
        self.storage == other.storage
    }
}

impl<ElT: Scalar> std::fmt::Display for BlockSparseTensor<ElT> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BlockSparseTensor(shape={:?}, nnzblocks={}, nnz={})",
            self.shape(),
            self.nonzero_block_count(),
            self.nonzero_element_count()
        )
    }
}
