//! Singular Value Decomposition (SVD) for dense tensors.
//!
//! The tensor is permuted so the left axes come first, viewed as a matrix,
//! decomposed with faer's thin SVD, and the factors are reshaped back.

use faer::linalg::solvers::{Svd, SvdError};

use crate::backend::AsFaerMat;
use crate::decomposition::truncation::TruncationParams;
use crate::error::TensorError;
use crate::operations::{permutedims, validate_permutation};
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Result of a dense SVD.
#[derive(Debug, Clone)]
pub struct SvdResult<ElT: Scalar> {
    /// Left singular vectors, shape `[...left_dims..., rank]`.
    pub u: DenseTensor<ElT>,

    /// Singular values, shape `[rank]`, descending.
    pub s: DenseTensor<ElT>,

    /// Conjugate-transposed right singular vectors, shape `[rank, ...right_dims...]`.
    pub vt: DenseTensor<ElT>,

    /// Number of kept singular values.
    pub rank: usize,

    /// Discarded squared weight, see [`TruncationParams`].
    pub truncation_error: f64,
}

/// Compute the thin SVD of a tensor without truncation.
///
/// # Example
///
/// ```
/// use blocktensors::Tensor;
/// use blocktensors::decomposition::svd;
///
/// let t = Tensor::<f64>::ones(&[2, 3, 4]);
/// let result = svd(&t, &[0, 1], &[2]).unwrap();
///
/// // U has shape [2, 3, rank], S has shape [rank], Vt has shape [rank, 4]
/// assert_eq!(result.u.ndim(), 3);
/// assert_eq!(result.s.ndim(), 1);
/// assert_eq!(result.vt.ndim(), 2);
/// ```
pub fn svd<ElT: Scalar>(
    tensor: &DenseTensor<ElT>,
    left_inds: &[usize],
    right_inds: &[usize],
) -> Result<SvdResult<ElT>, TensorError> {
    svd_truncated(tensor, left_inds, right_inds, &TruncationParams::default())
}

/// Compute a truncated SVD of a tensor.
///
/// # Errors
///
/// - `InvalidPermutation` unless `left_inds` and `right_inds` together name
///   every axis exactly once
/// - `SvdError` if faer fails to converge
///
/// # Example
///
/// ```
/// use blocktensors::Tensor;
/// use blocktensors::decomposition::{TruncationParams, svd_truncated};
///
/// let t = Tensor::<f64>::ones(&[4, 4]);
/// let params = TruncationParams::new().with_max_rank(2).with_cutoff(1e-10);
/// let result = svd_truncated(&t, &[0], &[1], &params).unwrap();
///
/// // A rank-one matrix
/// assert_eq!(result.rank, 1);
/// ```
pub fn svd_truncated<ElT: Scalar>(
    tensor: &DenseTensor<ElT>,
    left_inds: &[usize],
    right_inds: &[usize],
    params: &TruncationParams,
) -> Result<SvdResult<ElT>, TensorError> {
    let shape = tensor.shape();
    let perm: Vec<usize> = left_inds.iter().chain(right_inds).copied().collect();
    validate_permutation(&perm, tensor.ndim())?;

    let left_dims: Vec<usize> = left_inds.iter().map(|&i| shape[i]).collect();
    let right_dims: Vec<usize> = right_inds.iter().map(|&i| shape[i]).collect();
    let m: usize = left_dims.iter().product();
    let n: usize = right_dims.iter().product();

    let matrix = permutedims(tensor, &perm)?;
    let svd_result: Svd<ElT> =
        Svd::new_thin(matrix.as_faer_mat(m, n)).map_err(|e: SvdError| TensorError::SvdError {
            message: format!("{:?}", e),
        })?;

    let u_mat = svd_result.U();
    let s_diag = svd_result.S();
    let v_mat = svd_result.V();

    let spectrum: Vec<f64> = (0..m.min(n)).map(|k| s_diag[k].real_part()).collect();
    let (rank, truncation_error) = params.kept_count(&spectrum);

    let mut u_data = Vec::with_capacity(m * rank);
    for j in 0..rank {
        for i in 0..m {
            u_data.push(u_mat[(i, j)]);
        }
    }

    let s_data: Vec<ElT> = spectrum[..rank].iter().map(|&s| ElT::from_real(s)).collect();

    // V^H[i, j] = conj(V[j, i])
    let mut vt_data = Vec::with_capacity(rank * n);
    for j in 0..n {
        for i in 0..rank {
            vt_data.push(v_mat[(j, i)].conjugate());
        }
    }

    let mut u_shape = left_dims;
    u_shape.push(rank);
    let mut vt_shape = vec![rank];
    vt_shape.extend(right_dims);

    Ok(SvdResult {
        u: DenseTensor::from_vec(u_data, &u_shape)?,
        s: DenseTensor::from_vec(s_data, &[rank])?,
        vt: DenseTensor::from_vec(vt_data, &vt_shape)?,
        rank,
        truncation_error,
    })
}
