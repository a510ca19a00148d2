//! Permutation backend trait.

use crate::scalar::Scalar;

/// Backend trait for permuting column-major data.
///
/// Works on raw slices so it serves both dense tensors and individual
/// blocks of a block-sparse arena.
pub trait PermutationBackend {
    /// Write `src` (shape `src_shape`) permuted by `perm` into `dest`.
    ///
    /// `perm[i]` gives the source dimension for the i-th dimension of the
    /// result.
    ///
    /// # Panics
    ///
    /// Panics if `dest.len() != src.len()`.
    fn permute_into<ElT: Scalar>(dest: &mut [ElT], src: &[ElT], src_shape: &[usize], perm: &[usize]);
}
