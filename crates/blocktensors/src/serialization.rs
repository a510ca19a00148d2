//! Versioned JSON records for block-sparse tensors.
//!
//! A record holds the index spaces (with QNs), the present block labels in
//! canonical order and the arena. Decoding rebuilds the offset table from
//! the labels and checks it against the arena, so a record that decodes is
//! a valid tensor.

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::blocksparse_tensor::BlockSparseTensor;
use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::storage::blocksparse::{BlockLabel, BlockOffsetTable, IndexSpaces};

/// Current record layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Serialized form of a [`BlockSparseTensor`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TensorRecord<ElT> {
    pub schema_version: u32,
    pub spaces: IndexSpaces,
    /// Present block labels, strictly increasing.
    pub blocks: Vec<Vec<usize>>,
    /// Blocks back to back in label order, each column-major.
    pub data: Vec<ElT>,
}

impl<ElT: Scalar> TensorRecord<ElT> {
    pub fn from_tensor(tensor: &BlockSparseTensor<ElT>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            spaces: tensor.spaces().clone(),
            blocks: tensor.offsets().labels().map(|l| l.coords().to_vec()).collect(),
            data: tensor.data().to_vec(),
        }
    }

    /// Validate the record and rebuild the tensor.
    ///
    /// # Errors
    ///
    /// - `SchemaVersionMismatch` for a record of another version
    /// - `Serialization` if the labels are not strictly increasing
    /// - `InvalidBlockLabel` / `WrongNumberOfIndices` for a label that does
    ///   not fit the spaces
    /// - `ShapeMismatch` if the arena length disagrees with the blocks
    pub fn into_tensor(self) -> Result<BlockSparseTensor<ElT>, TensorError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(TensorError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: self.schema_version,
            });
        }
        let labels: Vec<BlockLabel> = self.blocks.into_iter().map(BlockLabel::from).collect();
        if labels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TensorError::Serialization {
                message: "block labels must be strictly increasing".to_string(),
            });
        }
        let offsets = BlockOffsetTable::from_blocks(&labels, &self.spaces)?;
        BlockSparseTensor::from_parts(self.data, offsets, self.spaces)
    }
}

/// Encode a tensor as a JSON record.
///
/// ```
/// use blocktensors::BlockSparseTensor;
/// use blocktensors::serialization::{from_json, to_json};
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces, Qn};
///
/// let space = IndexSpace::with_qns(vec![1, 2], vec![Qn::new(&[1]), Qn::new(&[-1])]).unwrap();
/// let mut t: BlockSparseTensor<f64> =
///     BlockSparseTensor::zeros(&[BlockLabel::new(&[1])], IndexSpaces::new(vec![space])).unwrap();
/// t.set(&[2], 0.5).unwrap();
///
/// let json = to_json(&t).unwrap();
/// let back: BlockSparseTensor<f64> = from_json(&json).unwrap();
/// assert_eq!(back, t);
/// ```
///
/// # Errors
///
/// `Serialization` if the tensor holds a NaN or infinite value, which JSON
/// numbers cannot represent.
pub fn to_json<ElT: Scalar + Serialize>(tensor: &BlockSparseTensor<ElT>) -> Result<String, TensorError> {
    if let Some(position) = tensor.data().iter().position(|x| !x.has_finite_parts()) {
        return Err(TensorError::Serialization {
            message: format!("non-finite value at arena position {}", position),
        });
    }
    let json = serde_json::to_string(&TensorRecord::from_tensor(tensor)).map_err(|e| {
        TensorError::Serialization {
            message: e.to_string(),
        }
    })?;
    debug!(
        "to_json: {} blocks, {} elements, {} bytes",
        tensor.nonzero_block_count(),
        tensor.nonzero_element_count(),
        json.len()
    );
    Ok(json)
}

/// Decode a tensor from a JSON record written by [`to_json`].
///
/// # Errors
///
/// `Serialization` for malformed JSON or unknown fields, plus the
/// validation errors of [`TensorRecord::into_tensor`].
pub fn from_json<ElT: Scalar + DeserializeOwned>(json: &str) -> Result<BlockSparseTensor<ElT>, TensorError> {
    let record: TensorRecord<ElT> = serde_json::from_str(json).map_err(|e| TensorError::Serialization {
        message: e.to_string(),
    })?;
    record.into_tensor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::c64;
    use crate::storage::blocksparse::{IndexSpace, Qn};

    fn sample() -> BlockSparseTensor<f64> {
        let q = |c: i32| Qn::new(&[c]);
        let spaces = IndexSpaces::new(vec![
            IndexSpace::with_qns(vec![2, 3], vec![q(0), q(1)]).unwrap(),
            IndexSpace::with_qns(vec![4, 5], vec![q(0), q(-1)]).unwrap(),
        ]);
        let mut t =
            BlockSparseTensor::zeros(&[BlockLabel::new(&[1, 0]), BlockLabel::new(&[0, 1])], spaces).unwrap();
        for (i, x) in t.data_mut().iter_mut().enumerate() {
            *x = i as f64 * 0.5;
        }
        t
    }

    #[test]
    fn test_record_layout() {
        let record = TensorRecord::from_tensor(&sample());
        assert_eq!(record.schema_version, SCHEMA_VERSION);
        assert_eq!(record.blocks, vec![vec![0, 1], vec![1, 0]]);
        assert_eq!(record.data.len(), 10 + 12);
    }

    #[test]
    fn test_json_keeps_qns() {
        let t = sample();
        let back: BlockSparseTensor<f64> = from_json(&to_json(&t).unwrap()).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.spaces()[1].qn(1), Some(&Qn::new(&[-1])));
    }

    #[test]
    fn test_complex_json() {
        let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![1, 2]).unwrap()]);
        let mut t: BlockSparseTensor<c64> = BlockSparseTensor::zeros(&[BlockLabel::new(&[1])], spaces).unwrap();
        t.set(&[2], c64::new(1.5, -2.0)).unwrap();

        let back: BlockSparseTensor<c64> = from_json(&to_json(&t).unwrap()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_version_mismatch() {
        let mut record = TensorRecord::from_tensor(&sample());
        record.schema_version = 7;
        assert_eq!(
            record.into_tensor().unwrap_err(),
            TensorError::SchemaVersionMismatch { expected: 1, found: 7 }
        );
    }

    #[test]
    fn test_rejects_inconsistent_records() {
        let mut unsorted = TensorRecord::from_tensor(&sample());
        unsorted.blocks.reverse();
        assert!(matches!(unsorted.into_tensor(), Err(TensorError::Serialization { .. })));

        let mut short = TensorRecord::from_tensor(&sample());
        short.data.pop();
        assert!(matches!(short.into_tensor(), Err(TensorError::ShapeMismatch { .. })));

        let mut out_of_range = TensorRecord::from_tensor(&sample());
        out_of_range.blocks[1] = vec![2, 0];
        assert!(matches!(
            out_of_range.into_tensor(),
            Err(TensorError::InvalidBlockLabel { .. })
        ));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut t = sample();
        t.data_mut()[3] = f64::INFINITY;
        assert_eq!(
            to_json(&t).unwrap_err(),
            TensorError::Serialization {
                message: "non-finite value at arena position 3".to_string()
            }
        );

        let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![2]).unwrap()]);
        let mut z: BlockSparseTensor<c64> = BlockSparseTensor::zeros(&[BlockLabel::new(&[0])], spaces).unwrap();
        z.set(&[1], c64::new(0.0, f64::NAN)).unwrap();
        assert!(matches!(to_json(&z), Err(TensorError::Serialization { .. })));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = to_json(&sample()).unwrap().replacen('{', "{\"extra\":0,", 1);
        assert!(matches!(
            from_json::<f64>(&json),
            Err(TensorError::Serialization { .. })
        ));
    }
}
