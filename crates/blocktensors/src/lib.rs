//! blocktensors - block-sparse tensors for tensor-network algorithms
//!
//! A block-sparse tensor stores only the dense blocks that are not zero by
//! symmetry. Each axis is an [`IndexSpace`](storage::blocksparse::IndexSpace)
//! partitioned into chunks (optionally tagged with conserved quantities), a
//! block is addressed by one chunk per axis, and all present blocks live
//! back to back in one arena described by a
//! [`BlockOffsetTable`](storage::blocksparse::BlockOffsetTable).
//!
//! # Architecture
//!
//! ```text
//! Level 1: High-level API
//!     → BlockSparseTensor (element/block access, add, permute)
//!     → combine_axes / split_axis, contract_blocksparse, svd_blocksparse
//!
//! Level 2: Dense kernels
//!     → DenseTensor, contract (faer GEMM), svd (faer thin SVD)
//!
//! Level 3: Backend implementation (backend module)
//!     → GenericBackend (strided permutation)
//!     → AsFaerMat (zero-copy matrix views of blocks)
//! ```
//!
//! # Example
//!
//! ```
//! use blocktensors::BlockSparseTensor;
//! use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
//!
//! let spaces = IndexSpaces::new(vec![
//!     IndexSpace::new(vec![2, 3]).unwrap(),
//!     IndexSpace::new(vec![4, 5]).unwrap(),
//! ]);
//! let mut t: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], spaces).unwrap();
//!
//! // Writing into an absent block materializes it
//! t.set(&[0, 0], 1.0).unwrap();
//! assert_eq!(t.nonzero_block_count(), 1);
//! assert_eq!(t.nonzero_element_count(), 8);
//!
//! // Absent blocks read as zero
//! assert_eq!(t.get(&[4, 8]).unwrap(), 0.0);
//! ```

pub mod backend;
pub mod blocksparse_tensor;
pub mod contract;
pub mod decomposition;
pub mod error;
pub mod operations;
pub mod random;
pub mod scalar;
pub mod serialization;
pub mod storage;
pub mod strides;
pub mod tensor;

pub use blocksparse_tensor::{BlockSparseTensor, BlockView, BlockViewMut};
pub use contract::{contract, contract_axes, contract_blocksparse};
pub use decomposition::{BlockSvdResult, TruncationParams, svd_blocksparse};
pub use error::TensorError;
pub use scalar::{Scalar, c64};
pub use storage::{Dense, TensorStorage};
pub use tensor::{DenseTensor, Tensor};
