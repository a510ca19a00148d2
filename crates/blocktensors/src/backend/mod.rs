//! Backend abstraction for dense kernels.
//!
//! - `GenericBackend`: loop-based permutation (always available)
//! - `faer_interop`: zero-copy matrix views of dense tensors and block slices,
//!   consumed by GEMM contraction and SVD

mod faer_interop;
mod generic;
mod permutation;

pub use faer_interop::{AsFaerMat, slice_as_mat, slice_as_mat_mut, tensor_from_faer_cols};
pub use generic::GenericBackend;
pub use permutation::PermutationBackend;
