//! Block offset table: which blocks are stored and where.
//!
//! Entries are kept in canonical (lexicographic label) order and their
//! offsets tile the backing store in that order, so iteration, comparison
//! and serialization are deterministic. A hash index gives O(1) lookup.

use std::collections::HashMap;

use super::block_label::BlockLabel;
use super::index_space::IndexSpaces;
use crate::error::TensorError;

/// One present block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockEntry {
    pub label: BlockLabel,
    /// Start of the block in the backing store.
    pub offset: usize,
    /// Dense shape, from the chunk sizes the label selects.
    pub shape: Vec<usize>,
}

impl BlockEntry {
    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage range of the block.
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// Maps present block labels to (offset, shape) in a flat backing store.
///
/// # Example
/// ```
/// use blocktensors::storage::blocksparse::{BlockLabel, BlockOffsetTable, IndexSpace, IndexSpaces};
///
/// let spaces = IndexSpaces::new(vec![
///     IndexSpace::new(vec![2, 3]).unwrap(),
///     IndexSpace::new(vec![4, 5]).unwrap(),
/// ]);
///
/// // Given out of order; offsets follow label order.
/// let labels = vec![BlockLabel::new(&[1, 1]), BlockLabel::new(&[0, 0])];
/// let table = BlockOffsetTable::from_blocks(&labels, &spaces).unwrap();
///
/// assert_eq!(table.offset_and_shape(&BlockLabel::new(&[0, 0])), Some((0, &[2, 4][..])));
/// assert_eq!(table.offset_and_shape(&BlockLabel::new(&[1, 1])), Some((8, &[3, 5][..])));
/// assert_eq!(table.index_of(&BlockLabel::new(&[1, 1])), Some(1));
/// assert_eq!(table.total_nonzero_elements(), 23);
/// ```
#[derive(Clone, Debug, Default)]
pub struct BlockOffsetTable {
    entries: Vec<BlockEntry>,
    positions: HashMap<BlockLabel, usize>,
    total_nonzero: usize,
}

impl BlockOffsetTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table for `labels` (any order, duplicates ignored).
    ///
    /// # Errors
    ///
    /// `InvalidBlockLabel` if a label component exceeds its axis's chunk
    /// count, `WrongNumberOfIndices` if a label has the wrong rank.
    pub fn from_blocks(labels: &[BlockLabel], spaces: &IndexSpaces) -> Result<Self, TensorError> {
        for label in labels {
            spaces.validate_label(label)?;
        }
        let mut sorted = labels.to_vec();
        sorted.sort();
        sorted.dedup();
        Ok(Self::from_sorted(sorted, spaces))
    }

    /// Assign offsets to already validated, sorted, distinct labels.
    pub(crate) fn from_sorted(labels: Vec<BlockLabel>, spaces: &IndexSpaces) -> Self {
        let mut entries = Vec::with_capacity(labels.len());
        let mut positions = HashMap::with_capacity(labels.len());
        let mut offset = 0;

        for (i, label) in labels.into_iter().enumerate() {
            let shape = spaces.block_shape(&label);
            let len: usize = shape.iter().product();
            positions.insert(label.clone(), i);
            entries.push(BlockEntry {
                label,
                offset,
                shape,
            });
            offset += len;
        }

        Self {
            entries,
            positions,
            total_nonzero: offset,
        }
    }

    /// True iff the block is stored.
    #[inline]
    pub fn present(&self, label: &BlockLabel) -> bool {
        self.positions.contains_key(label)
    }

    /// Offset and dense shape of a stored block.
    pub fn offset_and_shape(&self, label: &BlockLabel) -> Option<(usize, &[usize])> {
        self.entry_for(label).map(|e| (e.offset, e.shape.as_slice()))
    }

    /// Canonical position of a stored block among all stored blocks.
    #[inline]
    pub fn index_of(&self, label: &BlockLabel) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// Sum of per-block element counts.
    #[inline]
    pub fn total_nonzero_elements(&self) -> usize {
        self.total_nonzero
    }

    #[inline]
    pub fn nonzero_block_count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_for(&self, label: &BlockLabel) -> Option<&BlockEntry> {
        self.index_of(label).map(|i| &self.entries[i])
    }

    /// The i-th stored block in canonical order.
    #[inline]
    pub fn entry(&self, i: usize) -> Option<&BlockEntry> {
        self.entries.get(i)
    }

    /// Entries in canonical order.
    pub fn iter(&self) -> std::slice::Iter<'_, BlockEntry> {
        self.entries.iter()
    }

    /// Labels in canonical order.
    pub fn labels(&self) -> impl Iterator<Item = &BlockLabel> {
        self.entries.iter().map(|e| &e.label)
    }

    /// Register a new block at its canonical position.
    ///
    /// Returns `Ok(None)` if the block was already present, otherwise the
    /// storage range the caller must fill with the block's data (all later
    /// blocks have moved up by that range's length).
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_blocks`].
    pub fn insert(
        &mut self,
        label: &BlockLabel,
        spaces: &IndexSpaces,
    ) -> Result<Option<std::ops::Range<usize>>, TensorError> {
        spaces.validate_label(label)?;
        if self.present(label) {
            return Ok(None);
        }

        let pos = self
            .entries
            .binary_search_by(|e| e.label.cmp(label))
            .unwrap_or_else(|p| p);
        let offset = self
            .entries
            .get(pos)
            .map_or(self.total_nonzero, |e| e.offset);
        let shape = spaces.block_shape(label);
        let len: usize = shape.iter().product();

        for entry in &mut self.entries[pos..] {
            entry.offset += len;
        }
        self.entries.insert(
            pos,
            BlockEntry {
                label: label.clone(),
                offset,
                shape,
            },
        );
        for (i, entry) in self.entries.iter().enumerate().skip(pos) {
            self.positions.insert(entry.label.clone(), i);
        }
        self.total_nonzero += len;

        Ok(Some(offset..offset + len))
    }

    /// Table of the axis-permuted tensor, plus its permuted spaces.
    ///
    /// Every label is permuted, then offsets are reassigned in the new
    /// canonical order.
    pub fn permute(&self, perm: &[usize], spaces: &IndexSpaces) -> (Self, IndexSpaces) {
        let new_spaces = spaces.permute(perm);
        let mut labels: Vec<BlockLabel> = self.labels().map(|l| l.permute(perm)).collect();
        labels.sort();
        (Self::from_sorted(labels, &new_spaces), new_spaces)
    }
}

impl PartialEq for BlockOffsetTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl std::fmt::Display for BlockOffsetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BlockOffsetTable(nnzblocks={}, nnz={})",
            self.nonzero_block_count(),
            self.total_nonzero
        )
    }
}
