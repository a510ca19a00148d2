//! Singular value decompositions.
//!
//! Both flavors split the axes of a tensor into a row group and a column
//! group, decompose the resulting matrix with faer, and return factors
//! carrying the original axes plus a new link axis.
//!
//! - [`svd`] / [`svd_truncated`]: dense tensors
//! - [`svd_blocksparse`]: block-sparse tensors, one dense SVD per sector
//!
//! Truncation is configured with [`TruncationParams`].
//!
//! # Example
//!
//! ```
//! use blocktensors::Tensor;
//! use blocktensors::decomposition::svd;
//!
//! let t = Tensor::<f64>::ones(&[2, 3, 4]);
//!
//! // Rows are axes [0, 1], columns axis [2]: a 6x4 matrix
//! let result = svd(&t, &[0, 1], &[2]).unwrap();
//! assert_eq!(result.rank, 4);
//! ```

mod blocksparse_svd;
mod svd;
mod truncation;

pub use blocksparse_svd::{BlockSvdResult, svd_blocksparse};
pub use svd::{SvdResult, svd, svd_truncated};
pub use truncation::TruncationParams;
