//! Axis permutation of dense tensors.
//!
//! ```text
//! permutedims(tensor, perm)
//!     → validate permutation
//!     → allocate output with permuted shape
//!     → permutedims_into(output, tensor, perm)
//!
//! permutedims_into(dest, src, perm)
//!     → GenericBackend
//! ```

use crate::backend::{GenericBackend, PermutationBackend};
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Permute the dimensions of a DenseTensor, returning a new DenseTensor.
///
/// `perm[i]` gives the source dimension for the i-th dimension of the result.
///
/// # Errors
///
/// Returns `InvalidPermutation` if `perm` is not a permutation of `0..ndim`.
///
/// # Examples
///
/// ```
/// use blocktensors::DenseTensor;
/// use blocktensors::operations::permutedims;
///
/// let t: DenseTensor<f64> = DenseTensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
///
/// let t2 = permutedims(&t, &[1, 0]).unwrap();
/// assert_eq!(t2.shape(), &[3, 2]);
/// assert_eq!(t.get(&[1, 0]), t2.get(&[0, 1]));
/// ```
pub fn permutedims<T: Scalar>(
    tensor: &DenseTensor<T>,
    perm: &[usize],
) -> Result<DenseTensor<T>, TensorError> {
    validate_permutation(perm, tensor.ndim())?;

    let new_shape: Vec<usize> = perm.iter().map(|&p| tensor.shape()[p]).collect();
    let mut result = DenseTensor::zeros(&new_shape);
    permutedims_into(&mut result, tensor, perm);

    Ok(result)
}

/// Permute `src` into an already allocated `dest`.
///
/// # Panics
///
/// Panics if `dest` does not hold as many elements as `src`.
///
/// ```
/// use blocktensors::DenseTensor;
/// use blocktensors::operations::permutedims_into;
///
/// let src: DenseTensor<f64> = DenseTensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// let mut dest: DenseTensor<f64> = DenseTensor::zeros(&[3, 2]);
///
/// permutedims_into(&mut dest, &src, &[1, 0]);
/// assert_eq!(src.get(&[1, 2]), dest.get(&[2, 1]));
/// ```
pub fn permutedims_into<T: Scalar>(dest: &mut DenseTensor<T>, src: &DenseTensor<T>, perm: &[usize]) {
    GenericBackend::permute_into(dest.data_mut(), src.data(), src.shape(), perm);
}

/// Check that `perm` is a permutation of `0..ndim`.
pub fn validate_permutation(perm: &[usize], ndim: usize) -> Result<(), TensorError> {
    let invalid = || TensorError::InvalidPermutation {
        perm: perm.to_vec(),
        ndim,
    };
    if perm.len() != ndim {
        return Err(invalid());
    }

    let mut seen = vec![false; ndim];
    for &p in perm {
        if p >= ndim || seen[p] {
            return Err(invalid());
        }
        seen[p] = true;
    }
    Ok(())
}

/// Inverse permutation: `inverse[perm[i]] = i`.
pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        inverse[p] = i;
    }
    inverse
}
