//! Axis chunk structure.
//!
//! An `IndexSpace` partitions one tensor axis into contiguous chunks and
//! optionally tags every chunk with a conserved quantity. `IndexSpaces`
//! holds one per axis and answers the block-shape questions of the offset
//! table.

use serde::{Deserialize, Serialize};

use super::block_label::BlockLabel;
use super::qn::Qn;
use crate::error::TensorError;
use crate::strides::row_major_cartesian;

/// Chunk structure of a single axis.
///
/// Stores chunk sizes and precomputes cumulative offsets for fast lookup.
/// Chunk count and every chunk size are at least 1.
///
/// # Example
/// ```
/// use blocktensors::storage::blocksparse::IndexSpace;
///
/// let space = IndexSpace::new(vec![2, 3, 4]).unwrap();
/// assert_eq!(space.nchunks(), 3);
/// assert_eq!(space.dim(), 9);
/// assert_eq!(space.locate(4), Some((1, 2)));
/// assert_eq!(space.locate(9), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IndexSpaceRecord", into = "IndexSpaceRecord")]
pub struct IndexSpace {
    chunk_sizes: Vec<usize>,
    /// cumulative[i] = sum of chunk_sizes[0..i]
    cumulative: Vec<usize>,
    qns: Option<Vec<Qn>>,
}

impl IndexSpace {
    /// Create an unlabeled index space.
    ///
    /// # Errors
    ///
    /// `InvalidIndexSpace` if there are no chunks or a chunk is empty.
    pub fn new(chunk_sizes: Vec<usize>) -> Result<Self, TensorError> {
        Self::build(chunk_sizes, None)
    }

    /// Create an index space whose chunks carry conserved quantities.
    ///
    /// ```
    /// use blocktensors::storage::blocksparse::{IndexSpace, Qn};
    ///
    /// let spin_half = IndexSpace::with_qns(vec![1, 1], vec![Qn::new(&[1]), Qn::new(&[-1])]).unwrap();
    /// assert_eq!(spin_half.qn(1), Some(&Qn::new(&[-1])));
    /// ```
    pub fn with_qns(chunk_sizes: Vec<usize>, qns: Vec<Qn>) -> Result<Self, TensorError> {
        Self::build(chunk_sizes, Some(qns))
    }

    fn build(chunk_sizes: Vec<usize>, qns: Option<Vec<Qn>>) -> Result<Self, TensorError> {
        if chunk_sizes.is_empty() {
            return Err(TensorError::InvalidIndexSpace {
                message: "an axis needs at least one chunk".into(),
            });
        }
        if let Some(pos) = chunk_sizes.iter().position(|&s| s == 0) {
            return Err(TensorError::InvalidIndexSpace {
                message: format!("chunk {} has size 0", pos),
            });
        }
        match &qns {
            Some(qns) if qns.len() != chunk_sizes.len() => {
                return Err(TensorError::InvalidIndexSpace {
                    message: format!(
                        "{} quantum numbers for {} chunks",
                        qns.len(),
                        chunk_sizes.len()
                    ),
                });
            }
            _ => {}
        }

        let mut cumulative = Vec::with_capacity(chunk_sizes.len() + 1);
        cumulative.push(0);
        let mut total = 0usize;
        for &size in &chunk_sizes {
            total += size;
            cumulative.push(total);
        }

        Ok(Self {
            chunk_sizes,
            cumulative,
            qns,
        })
    }

    /// Single-chunk space of the given dimension.
    pub fn trivial(dim: usize) -> Result<Self, TensorError> {
        Self::new(vec![dim])
    }

    #[inline]
    pub fn nchunks(&self) -> usize {
        self.chunk_sizes.len()
    }

    /// Total dimension (sum of chunk sizes).
    #[inline]
    pub fn dim(&self) -> usize {
        self.cumulative[self.chunk_sizes.len()]
    }

    /// # Panics
    /// Panics if `chunk` is out of range.
    #[inline]
    pub fn chunk_size(&self, chunk: usize) -> usize {
        self.chunk_sizes[chunk]
    }

    /// Position where `chunk` starts along the dense axis.
    #[inline]
    pub fn chunk_offset(&self, chunk: usize) -> usize {
        self.cumulative[chunk]
    }

    #[inline]
    pub fn chunk_sizes(&self) -> &[usize] {
        &self.chunk_sizes
    }

    #[inline]
    pub fn qns(&self) -> Option<&[Qn]> {
        self.qns.as_deref()
    }

    #[inline]
    pub fn qn(&self, chunk: usize) -> Option<&Qn> {
        self.qns.as_ref().and_then(|q| q.get(chunk))
    }

    #[inline]
    pub fn has_qns(&self) -> bool {
        self.qns.is_some()
    }

    /// Same chunk sizes, QN labels ignored.
    pub fn same_structure(&self, other: &IndexSpace) -> bool {
        self.chunk_sizes == other.chunk_sizes
    }

    /// Map a dense coordinate to `(chunk, offset_within_chunk)`.
    ///
    /// Returns `None` if `index >= dim()`.
    pub fn locate(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.dim() {
            return None;
        }
        // Exact hit on a boundary belongs to the next chunk.
        let chunk = match self.cumulative[1..].binary_search(&index) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        Some((chunk, index - self.cumulative[chunk]))
    }

    /// Product space of several axes, chunk tuples linearized row-major.
    ///
    /// The merged chunk for tuple `(c0, .., cn)` has size `prod(size_i(c_i))`
    /// and, when every factor carries QNs, charge `sum(qn_i(c_i))`.
    ///
    /// ```
    /// use blocktensors::storage::blocksparse::IndexSpace;
    ///
    /// let a = IndexSpace::new(vec![1, 2]).unwrap();
    /// let b = IndexSpace::new(vec![3, 4]).unwrap();
    /// let ab = IndexSpace::merge(&[&a, &b]).unwrap();
    /// assert_eq!(ab.chunk_sizes(), &[3, 4, 6, 8]);
    /// ```
    pub fn merge(spaces: &[&IndexSpace]) -> Result<IndexSpace, TensorError> {
        let extents: Vec<usize> = spaces.iter().map(|s| s.nchunks()).collect();
        let count: usize = extents.iter().product();
        let labeled = !spaces.is_empty() && spaces.iter().all(|s| s.has_qns());

        let mut sizes = Vec::with_capacity(count);
        let mut qns = labeled.then(|| Vec::with_capacity(count));
        for linear in 0..count {
            let tuple = row_major_cartesian(linear, &extents);
            sizes.push(
                spaces
                    .iter()
                    .zip(&tuple)
                    .map(|(s, &c)| s.chunk_size(c))
                    .product(),
            );
            if let Some(qns) = qns.as_mut() {
                qns.push(Self::merge_qns(spaces, &tuple));
            }
        }
        Self::build(sizes, qns)
    }

    /// Total charge of a chunk tuple across `spaces`.
    ///
    /// Unlabeled spaces contribute nothing.
    pub fn merge_qns(spaces: &[&IndexSpace], tuple: &[usize]) -> Qn {
        spaces
            .iter()
            .zip(tuple)
            .filter_map(|(s, &c)| s.qn(c).cloned())
            .sum()
    }
}

impl std::fmt::Display for IndexSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qns {
            None => write!(f, "IndexSpace({:?})", self.chunk_sizes),
            Some(qns) => {
                write!(f, "IndexSpace(")?;
                for (i, (size, qn)) in self.chunk_sizes.iter().zip(qns).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}=>{}", qn, size)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// On-disk form of an index space; cumulative offsets are rebuilt on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct IndexSpaceRecord {
    chunk_sizes: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    qns: Option<Vec<Qn>>,
}

impl TryFrom<IndexSpaceRecord> for IndexSpace {
    type Error = TensorError;

    fn try_from(record: IndexSpaceRecord) -> Result<Self, Self::Error> {
        IndexSpace::build(record.chunk_sizes, record.qns)
    }
}

impl From<IndexSpace> for IndexSpaceRecord {
    fn from(space: IndexSpace) -> Self {
        IndexSpaceRecord {
            chunk_sizes: space.chunk_sizes,
            qns: space.qns,
        }
    }
}

/// Index spaces of every axis of a block-sparse tensor.
///
/// # Example
/// ```
/// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
///
/// let spaces = IndexSpaces::new(vec![
///     IndexSpace::new(vec![2, 3]).unwrap(),
///     IndexSpace::new(vec![4, 5, 6]).unwrap(),
/// ]);
/// assert_eq!(spaces.dense_shape(), vec![5, 15]);
/// assert_eq!(spaces.block_shape(&BlockLabel::new(&[1, 2])), vec![3, 6]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexSpaces {
    spaces: Vec<IndexSpace>,
}

impl IndexSpaces {
    pub fn new(spaces: Vec<IndexSpace>) -> Self {
        Self { spaces }
    }

    /// Number of axes.
    #[inline]
    pub fn ndims(&self) -> usize {
        self.spaces.len()
    }

    #[inline]
    pub fn space(&self, axis: usize) -> &IndexSpace {
        &self.spaces[axis]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexSpace> {
        self.spaces.iter()
    }

    pub fn as_slice(&self) -> &[IndexSpace] {
        &self.spaces
    }

    pub fn into_vec(self) -> Vec<IndexSpace> {
        self.spaces
    }

    /// Chunk count of every axis.
    pub fn nchunks(&self) -> Vec<usize> {
        self.spaces.iter().map(|s| s.nchunks()).collect()
    }

    /// Total size of every axis.
    pub fn dense_shape(&self) -> Vec<usize> {
        self.spaces.iter().map(|s| s.dim()).collect()
    }

    /// Dense shape of the block at `label`.
    ///
    /// # Panics
    /// Panics if a component is out of range; use [`Self::validate_label`] first
    /// for untrusted labels.
    pub fn block_shape(&self, label: &BlockLabel) -> Vec<usize> {
        self.spaces
            .iter()
            .zip(label.coords())
            .map(|(s, &c)| s.chunk_size(c))
            .collect()
    }

    /// Number of elements of the block at `label`.
    pub fn block_len(&self, label: &BlockLabel) -> usize {
        self.spaces
            .iter()
            .zip(label.coords())
            .map(|(s, &c)| s.chunk_size(c))
            .product()
    }

    /// Dense coordinate at which the block at `label` starts.
    pub fn block_start(&self, label: &BlockLabel) -> Vec<usize> {
        self.spaces
            .iter()
            .zip(label.coords())
            .map(|(s, &c)| s.chunk_offset(c))
            .collect()
    }

    /// Check rank and per-axis range of a label.
    ///
    /// # Errors
    ///
    /// `WrongNumberOfIndices` for a rank mismatch, `InvalidBlockLabel` if a
    /// component is not below its axis's chunk count.
    pub fn validate_label(&self, label: &BlockLabel) -> Result<(), TensorError> {
        if label.ndims() != self.ndims() {
            return Err(TensorError::WrongNumberOfIndices {
                expected: self.ndims(),
                actual: label.ndims(),
            });
        }
        for (axis, (space, &c)) in self.spaces.iter().zip(label.coords()).enumerate() {
            if c >= space.nchunks() {
                return Err(TensorError::InvalidBlockLabel {
                    label: label.coords().to_vec(),
                    axis,
                    nchunks: space.nchunks(),
                });
            }
        }
        Ok(())
    }

    /// Reordered axes: `result[i] = self[perm[i]]`.
    pub fn permute(&self, perm: &[usize]) -> Self {
        Self::new(perm.iter().map(|&i| self.spaces[i].clone()).collect())
    }

    /// Sum of chunk charges of a block; `None` unless every axis carries QNs.
    pub fn block_flux(&self, label: &BlockLabel) -> Option<Qn> {
        if !self.spaces.iter().all(|s| s.has_qns()) {
            return None;
        }
        Some(
            self.spaces
                .iter()
                .zip(label.coords())
                .filter_map(|(s, &c)| s.qn(c).cloned())
                .sum(),
        )
    }
}

impl std::ops::Index<usize> for IndexSpaces {
    type Output = IndexSpace;

    fn index(&self, axis: usize) -> &IndexSpace {
        &self.spaces[axis]
    }
}

impl From<Vec<IndexSpace>> for IndexSpaces {
    fn from(spaces: Vec<IndexSpace>) -> Self {
        Self::new(spaces)
    }
}

impl<'a> IntoIterator for &'a IndexSpaces {
    type Item = &'a IndexSpace;
    type IntoIter = std::slice::Iter<'a, IndexSpace>;

    fn into_iter(self) -> Self::IntoIter {
        self.spaces.iter()
    }
}
