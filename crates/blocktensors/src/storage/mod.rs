//! Storage types for tensor data.
//!
//! ```text
//! TensorStorage<T> (trait)
//! └── Dense<T>        - contiguous column-major array
//!
//! BlockSparse<T>      - one flat arena of dense blocks plus a BlockOffsetTable
//! ```
//!
//! `BlockSparse` does not implement `TensorStorage`: it has no single
//! rectangular layout, only per-block ones.

pub mod blocksparse;
mod dense;

use crate::scalar::Scalar;

pub use dense::Dense;

/// Flat element buffer behind a [`Tensor`](crate::tensor::Tensor).
///
/// The buffer knows nothing about shape; the tensor wrapper owns shape and
/// strides.
pub trait TensorStorage<T: Scalar>: Clone + std::fmt::Debug {
    fn zeros(len: usize) -> Self;

    fn from_vec(data: Vec<T>) -> Self;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_slice(&self) -> &[T];

    fn as_mut_slice(&mut self) -> &mut [T];

    fn into_vec(self) -> Vec<T>;
}

impl<T: Scalar> TensorStorage<T> for Dense<T> {
    fn zeros(len: usize) -> Self {
        Dense::zeros(len)
    }

    fn from_vec(data: Vec<T>) -> Self {
        Dense::from_vec(data)
    }

    fn len(&self) -> usize {
        Dense::len(self)
    }

    fn as_slice(&self) -> &[T] {
        Dense::as_slice(self)
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        Dense::as_mut_slice(self)
    }

    fn into_vec(self) -> Vec<T> {
        Dense::into_vec(self)
    }
}
