//! Error types for blocktensors.

use thiserror::Error;

/// Errors that can occur in tensor operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TensorError {
    /// Shape mismatch between data length and expected size.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Index out of bounds.
    #[error("index out of bounds: index {index} is out of range for dimension {dim_size}")]
    IndexOutOfBounds { index: usize, dim_size: usize },

    /// Wrong number of indices provided.
    #[error("wrong number of indices: expected {expected}, got {actual}")]
    WrongNumberOfIndices { expected: usize, actual: usize },

    /// Invalid permutation.
    #[error("invalid permutation {perm:?} for tensor with {ndim} dimensions")]
    InvalidPermutation { perm: Vec<usize>, ndim: usize },

    /// A block label component exceeds the chunk count of its axis.
    #[error("invalid block label {label:?}: component {axis} must be below {nchunks}")]
    InvalidBlockLabel {
        label: Vec<usize>,
        axis: usize,
        nchunks: usize,
    },

    /// Index space with no chunks, an empty chunk, or a QN list of the wrong length.
    #[error("invalid index space: {message}")]
    InvalidIndexSpace { message: String },

    /// Operands of an elementwise operation have different chunk structure.
    #[error("incompatible index spaces on axis {axis}: {left:?} vs {right:?}")]
    IncompatibleIndexSpaces {
        axis: usize,
        left: Vec<usize>,
        right: Vec<usize>,
    },

    /// Operands of an elementwise operation label an axis with different QNs.
    #[error("incompatible quantum numbers on axis {axis}")]
    IncompatibleQns { axis: usize },

    /// Reshape target does not match the source axis (total dimension, or
    /// chunk count when dimensions agree but chunk structure does not).
    #[error("incompatible reshape target: source has {expected}, target has {actual}")]
    IncompatibleReshapeTarget { expected: usize, actual: usize },

    /// Axis range outside the tensor.
    #[error("axis range {start}..{end} is invalid for tensor with {ndim} dimensions")]
    InvalidAxisRange {
        start: usize,
        end: usize,
        ndim: usize,
    },

    /// Sparsity pattern is not block diagonal for the requested row/column split.
    #[error("tensor is not block diagonal: {message}")]
    NonBlockDiagonalInput { message: String },

    /// Contracted axes do not share chunk structure.
    #[error("contraction axis mismatch: axis {axis_a} {chunks_a:?} vs axis {axis_b} {chunks_b:?}")]
    ContractionAxisMismatch {
        axis_a: usize,
        axis_b: usize,
        chunks_a: Vec<usize>,
        chunks_b: Vec<usize>,
    },

    /// SVD computation error.
    #[error("SVD error: {message}")]
    SvdError { message: String },

    /// Block not found in block-sparse tensor.
    #[error("block {block:?} not found in tensor")]
    BlockNotFound { block: Vec<usize> },

    /// Encoding or decoding of a tensor record failed.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Record written with a different schema version.
    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: u32, found: u32 },
}
