//! Tensor contraction.
//!
//! Contractions are specified by integer labels, one per axis:
//! - Negative labels shared by both tensors are summed over
//! - All other labels appear in the output, sorted ascending
//!
//! # Implementations
//!
//! - `gemm`: dense tensors, one faer GEMM after permuting to matrix form
//! - `blocksparse`: block-sparse tensors, one GEMM per matching block pair
//!
//! # Example
//!
//! ```
//! use blocktensors::{Tensor, contract};
//!
//! // Matrix multiplication: C[i,k] = A[i,j] * B[j,k]
//! let a = Tensor::<f64>::ones(&[2, 3]);
//! let b = Tensor::<f64>::ones(&[3, 4]);
//!
//! // labels: A[1,-1], B[-1,2] -> C[1,2]
//! let c = contract(&a, &[1, -1], &b, &[-1, 2]).unwrap();
//! assert_eq!(c.shape(), &[2, 4]);
//! ```

mod blocksparse;
mod gemm;
mod properties;

pub use blocksparse::{contract_axes, contract_blocksparse};
pub use gemm::contract;
pub use properties::ContractionProperties;
