//! Dense n-dimensional tensor.
//!
//! Dense tensors are the kernel layer under the block-sparse engine: each
//! block is handed to faer as a `DenseTensor` (or a zero-copy view of one),
//! and `to_dense` materializes a whole block-sparse tensor for checking.

use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::storage::{Dense, TensorStorage};
use crate::strides::{cartesian_to_linear, checked_linear_index, compute_strides};
use std::marker::PhantomData;

/// A n-dimensional tensor over flat storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<ElT: Scalar, StoreT: TensorStorage<ElT> = Dense<ElT>> {
    storage: StoreT,
    shape: Vec<usize>,
    strides: Vec<usize>,
    _phantom: PhantomData<ElT>,
}

/// Type alias for dense tensors.
pub type DenseTensor<ElT> = Tensor<ElT, Dense<ElT>>;

impl<ElT: Scalar, StoreT: TensorStorage<ElT>> Tensor<ElT, StoreT> {
    /// Create a new tensor with the given shape, zero-initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use blocktensors::Tensor;
    ///
    /// let t: Tensor<f64> = Tensor::zeros(&[2, 3, 4]);
    /// assert_eq!(t.shape(), &[2, 3, 4]);
    /// assert_eq!(t.len(), 24);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        let len: usize = shape.iter().product();
        Self {
            storage: StoreT::zeros(len.max(1)), // At least 1 for scalar (empty shape)
            shape: shape.to_vec(),
            strides: compute_strides(shape),
            _phantom: PhantomData,
        }
    }

    /// Create tensor from column-major data and shape.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if data length doesn't match shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use blocktensors::{DenseTensor, Tensor};
    ///
    /// let t: DenseTensor<f64> = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(t.get(&[1, 0]), Some(&2.0)); // Column-major: [1,0] is second element
    /// assert_eq!(t.get(&[0, 1]), Some(&3.0));
    /// ```
    pub fn from_vec(data: Vec<ElT>, shape: &[usize]) -> Result<Self, TensorError> {
        let expected_len: usize = shape.iter().product::<usize>().max(1);
        if data.len() != expected_len {
            return Err(TensorError::ShapeMismatch {
                expected: expected_len,
                actual: data.len(),
            });
        }
        Ok(Self {
            storage: StoreT::from_vec(data),
            shape: shape.to_vec(),
            strides: compute_strides(shape),
            _phantom: PhantomData,
        })
    }

    /// Wrap column-major data that is known to hold `prod(shape)` elements,
    /// such as a block slice described by its offset-table entry.
    pub(crate) fn from_block_data(data: Vec<ElT>, shape: &[usize]) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>().max(1));
        Self {
            storage: StoreT::from_vec(data),
            shape: shape.to_vec(),
            strides: compute_strides(shape),
            _phantom: PhantomData,
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Get underlying data as slice.
    #[inline]
    pub fn data(&self) -> &[ElT] {
        self.storage.as_slice()
    }

    /// Get underlying data as mutable slice.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [ElT] {
        self.storage.as_mut_slice()
    }

    /// Consume the tensor, returning its column-major data.
    pub fn into_data(self) -> Vec<ElT> {
        self.storage.into_vec()
    }

    /// Get element by cartesian indices.
    ///
    /// Returns `None` if indices are out of bounds or wrong number of indices.
    pub fn get(&self, indices: &[usize]) -> Option<&ElT> {
        let linear = checked_linear_index(indices, &self.shape).ok()?;
        self.storage.as_slice().get(linear)
    }

    /// Set element by cartesian indices.
    ///
    /// # Errors
    ///
    /// Returns error if indices are out of bounds or wrong number of indices.
    pub fn set(&mut self, indices: &[usize], value: ElT) -> Result<(), TensorError> {
        let linear = checked_linear_index(indices, &self.shape)?;
        self.storage.as_mut_slice()[linear] = value;
        Ok(())
    }

    /// Fill all elements with a value.
    pub fn fill(&mut self, value: ElT) {
        self.storage.as_mut_slice().fill(value);
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        let mut t = Self::zeros(shape);
        t.fill(ElT::one());
        t
    }
}

impl<ElT: Scalar> Tensor<ElT, Dense<ElT>> {
    /// Reinterpret the data under a new shape with the same element count.
    ///
    /// Column-major data is left untouched, so merging adjacent axes is a
    /// pure relabeling.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the total number of elements differs.
    ///
    /// ```
    /// use blocktensors::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let t3x2 = t.reshape(&[3, 2]).unwrap();
    /// assert_eq!(t3x2.get(&[0, 1]), Some(&4.0));
    /// ```
    pub fn reshape(self, new_shape: &[usize]) -> Result<Self, TensorError> {
        let new_len: usize = new_shape.iter().product::<usize>().max(1);
        if self.len() != new_len {
            return Err(TensorError::ShapeMismatch {
                expected: self.len(),
                actual: new_len,
            });
        }
        Ok(Self {
            storage: self.storage,
            shape: new_shape.to_vec(),
            strides: compute_strides(new_shape),
            _phantom: PhantomData,
        })
    }

    /// Permute the dimensions of the tensor.
    ///
    /// `perm[i]` gives the source dimension for the i-th dimension of the result.
    ///
    /// # Errors
    ///
    /// Returns error if `perm` is not a valid permutation of `0..ndim`.
    ///
    /// ```
    /// use blocktensors::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let t2 = t.permutedims(&[1, 0]).unwrap();
    /// assert_eq!(t2.shape(), &[3, 2]);
    /// assert_eq!(t.get(&[0, 2]), t2.get(&[2, 0]));
    /// ```
    pub fn permutedims(&self, perm: &[usize]) -> Result<Self, TensorError> {
        crate::operations::permutedims(self, perm)
    }

    /// Elementwise complex conjugate.
    pub fn conj(&self) -> Self {
        let data = self.data().iter().map(|x| x.conjugate()).collect();
        Self {
            storage: Dense::from_vec(data),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            _phantom: PhantomData,
        }
    }

    /// Linear offset of `indices`, without bounds checks.
    #[inline]
    pub(crate) fn offset_of(&self, indices: &[usize]) -> usize {
        cartesian_to_linear(indices, &self.strides)
    }
}
