//! Block-sparse storage types.
//!
//! A block-sparse tensor stores only the dense blocks that are not
//! structurally zero, which is what conserved quantities make typical in
//! tensor-network algorithms.
//!
//! ## Core Types
//!
//! - [`IndexSpace`] - chunk sizes (and optional [`Qn`]s) of one axis
//! - [`IndexSpaces`] - one `IndexSpace` per axis
//! - [`BlockLabel`] - chunk index per axis identifying a block
//! - [`BlockOffsetTable`] - present blocks, their offsets and shapes
//! - [`BlockSparse`] - the arena plus table plus spaces
//!
//! # Example
//!
//! ```
//! use blocktensors::storage::blocksparse::{BlockLabel, BlockOffsetTable, IndexSpace, IndexSpaces};
//!
//! let spaces = IndexSpaces::new(vec![
//!     IndexSpace::new(vec![2, 3]).unwrap(),
//!     IndexSpace::new(vec![4, 5, 6]).unwrap(),
//! ]);
//!
//! // Only store blocks (0,0), (0,2), (1,1)
//! let labels = vec![
//!     BlockLabel::new(&[0, 0]),
//!     BlockLabel::new(&[0, 2]),
//!     BlockLabel::new(&[1, 1]),
//! ];
//!
//! let table = BlockOffsetTable::from_blocks(&labels, &spaces).unwrap();
//! assert_eq!(table.total_nonzero_elements(), 8 + 12 + 15);
//! ```

mod block_label;
mod block_offsets;
mod index_space;
mod qn;
mod storage;

pub use block_label::BlockLabel;
pub use block_offsets::{BlockEntry, BlockOffsetTable};
pub use index_space::{IndexSpace, IndexSpaces};
pub use qn::Qn;
pub use storage::BlockSparse;
