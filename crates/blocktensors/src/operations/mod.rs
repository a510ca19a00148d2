//! Tensor operations.
//!
//! ```text
//! Level 1: High-level API (permutedims, permutedims_blocksparse, add, combine)
//!     → validate, allocate output
//!
//! Level 2: In-place API (permutedims_into, scale_blocksparse_inplace)
//!     → dispatch to backend
//!
//! Level 3: Backend implementation (GenericBackend)
//! ```

mod axes;
pub mod blocksparse;
mod permutedims;
mod reshape;

pub use axes::{common_axes, contraction_labels, uncommon_axes};
pub use blocksparse::{
    add_blocksparse, conj_blocksparse, norm_blocksparse, norm_sqr_blocksparse,
    permutedims_blocksparse, scale_blocksparse, scale_blocksparse_inplace, sub_blocksparse,
};
pub use permutedims::{inverse_permutation, permutedims, permutedims_into, validate_permutation};
pub use reshape::{combine_axes, split_axis};
