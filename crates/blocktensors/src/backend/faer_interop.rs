//! Zero-copy views between tensor data and faer matrices.
//!
//! Dense tensors and the blocks of a block-sparse arena are both
//! column-major, so any contiguous slice of `rows * cols` elements can be
//! handed to faer as a matrix without copying.

use faer::{MatMut, MatRef};

use crate::scalar::Scalar;
use crate::tensor::{DenseTensor, Tensor};

/// Extension trait for viewing a `DenseTensor` as a faer matrix.
pub trait AsFaerMat<T: Scalar> {
    /// View tensor data as an immutable `rows x cols` matrix.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols != tensor.len()`.
    ///
    /// ```
    /// use blocktensors::Tensor;
    /// use blocktensors::backend::AsFaerMat;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let mat = t.as_faer_mat(2, 3);
    /// assert_eq!(mat[(1, 2)], 6.0);
    /// ```
    fn as_faer_mat(&self, rows: usize, cols: usize) -> MatRef<'_, T>;

    /// View tensor data as a mutable `rows x cols` matrix.
    ///
    /// # Panics
    ///
    /// Panics if `rows * cols != tensor.len()`.
    fn as_faer_mat_mut(&mut self, rows: usize, cols: usize) -> MatMut<'_, T>;
}

impl<T: Scalar> AsFaerMat<T> for DenseTensor<T> {
    fn as_faer_mat(&self, rows: usize, cols: usize) -> MatRef<'_, T> {
        slice_as_mat(self.data(), rows, cols)
    }

    fn as_faer_mat_mut(&mut self, rows: usize, cols: usize) -> MatMut<'_, T> {
        slice_as_mat_mut(self.data_mut(), rows, cols)
    }
}

/// View a column-major slice (e.g. one block of an arena) as a matrix.
///
/// # Panics
///
/// Panics if `rows * cols != data.len()`.
pub fn slice_as_mat<T: Scalar>(data: &[T], rows: usize, cols: usize) -> MatRef<'_, T> {
    assert_eq!(
        rows * cols,
        data.len(),
        "matrix dimensions ({} x {}) must match data length ({})",
        rows,
        cols,
        data.len()
    );
    MatRef::from_column_major_slice(data, rows, cols)
}

/// Mutable counterpart of [`slice_as_mat`].
pub fn slice_as_mat_mut<T: Scalar>(data: &mut [T], rows: usize, cols: usize) -> MatMut<'_, T> {
    assert_eq!(
        rows * cols,
        data.len(),
        "matrix dimensions ({} x {}) must match data length ({})",
        rows,
        cols,
        data.len()
    );
    MatMut::from_column_major_slice_mut(data, rows, cols)
}

/// Copy the leading `cols` columns of a faer matrix into a `[rows, cols]` tensor.
pub fn tensor_from_faer_cols<T: Scalar>(mat: MatRef<'_, T>, cols: usize) -> DenseTensor<T> {
    let rows = mat.nrows();
    let mut data = Vec::with_capacity(rows * cols);
    for j in 0..cols {
        for i in 0..rows {
            data.push(mat[(i, j)]);
        }
    }
    Tensor::from_vec(data, &[rows, cols]).unwrap_or_else(|_| Tensor::zeros(&[rows, cols]))
}
