//! Stride and linearization utilities.
//!
//! Element data (dense tensors and the interior of every block) is
//! column-major, the layout faer expects. Chunk tuples of a combined axis
//! are linearized row-major (last merged axis fastest), see
//! [`row_major_linear`].

use crate::error::TensorError;

/// Compute column-major strides from shape.
///
/// For shape [d0, d1, d2, ...], returns strides [1, d0, d0*d1, ...].
///
/// # Examples
///
/// ```
/// use blocktensors::strides::compute_strides;
///
/// assert_eq!(compute_strides(&[3, 4, 5]), vec![1, 3, 12]);
/// assert_eq!(compute_strides(&[2, 3]), vec![1, 2]);
/// assert_eq!(compute_strides(&[]), Vec::<usize>::new());
/// ```
pub fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = Vec::with_capacity(shape.len());
    let mut stride = 1;

    for &dim in shape {
        strides.push(stride);
        stride *= dim;
    }

    strides
}

/// Convert cartesian indices to a linear index using the given strides.
#[inline]
pub fn cartesian_to_linear(indices: &[usize], strides: &[usize]) -> usize {
    indices
        .iter()
        .zip(strides.iter())
        .map(|(&idx, &stride)| idx * stride)
        .sum()
}

/// Convert a column-major linear index to cartesian indices.
pub fn linear_to_cartesian(mut linear: usize, shape: &[usize]) -> Vec<usize> {
    let mut indices = Vec::with_capacity(shape.len());

    for &dim in shape {
        indices.push(linear % dim);
        linear /= dim;
    }

    indices
}

/// Bounds-checked column-major linearization.
///
/// # Errors
///
/// `WrongNumberOfIndices` if the index count differs from the rank,
/// `IndexOutOfBounds` if any coordinate is outside its dimension.
pub fn checked_linear_index(indices: &[usize], shape: &[usize]) -> Result<usize, TensorError> {
    if indices.len() != shape.len() {
        return Err(TensorError::WrongNumberOfIndices {
            expected: shape.len(),
            actual: indices.len(),
        });
    }
    let mut linear = 0;
    let mut stride = 1;
    for (&idx, &dim) in indices.iter().zip(shape) {
        if idx >= dim {
            return Err(TensorError::IndexOutOfBounds {
                index: idx,
                dim_size: dim,
            });
        }
        linear += idx * stride;
        stride *= dim;
    }
    Ok(linear)
}

/// Row-major rank of a tuple within `extents` (last position fastest).
///
/// ```
/// use blocktensors::strides::row_major_linear;
///
/// // extents [2, 3]: (0,0)=0, (0,2)=2, (1,0)=3
/// assert_eq!(row_major_linear(&[1, 0], &[2, 3]), 3);
/// assert_eq!(row_major_linear(&[1, 2], &[2, 3]), 5);
/// ```
pub fn row_major_linear(tuple: &[usize], extents: &[usize]) -> usize {
    tuple
        .iter()
        .zip(extents)
        .fold(0, |acc, (&t, &e)| acc * e + t)
}

/// Inverse of [`row_major_linear`].
pub fn row_major_cartesian(mut linear: usize, extents: &[usize]) -> Vec<usize> {
    let mut tuple = vec![0; extents.len()];
    for (slot, &e) in tuple.iter_mut().zip(extents).rev() {
        *slot = linear % e;
        linear /= e;
    }
    tuple
}
