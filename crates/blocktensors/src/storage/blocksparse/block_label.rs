//! Block labels for block-sparse storage.
//!
//! A `BlockLabel` names one block by the chunk it occupies on every axis.

use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

/// A tuple of per-axis chunk indices (0-based) with a precomputed hash.
///
/// Uses `SmallVec<[usize; 8]>` so labels of rank <= 8 live on the stack.
/// Ordering is lexicographic, which is the canonical block order of every
/// offset table.
///
/// # Example
/// ```
/// use blocktensors::storage::blocksparse::BlockLabel;
///
/// let label = BlockLabel::new(&[1, 0, 2]);
/// assert_eq!(label.ndims(), 3);
/// assert_eq!(label[2], 2);
/// assert!(BlockLabel::new(&[0, 5]) < BlockLabel::new(&[1, 0]));
/// ```
#[derive(Clone, Debug)]
pub struct BlockLabel {
    coords: SmallVec<[usize; 8]>,
    hash: u64,
}

impl BlockLabel {
    pub fn new(coords: &[usize]) -> Self {
        Self::collect_from(coords.iter().copied())
    }

    /// Build a label by collecting chunk indices from an iterator.
    pub fn collect_from<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let coords: SmallVec<[usize; 8]> = iter.into_iter().collect();
        let hash = compute_hash(&coords);
        Self { coords, hash }
    }

    /// Number of axes.
    #[inline]
    pub fn ndims(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn coords(&self) -> &[usize] {
        &self.coords
    }

    /// Label with reordered components: `result[i] = self[perm[i]]`.
    pub fn permute(&self, perm: &[usize]) -> Self {
        Self::collect_from(perm.iter().map(|&i| self.coords[i]))
    }

    /// Components at the given axes, in the order given.
    pub fn select(&self, axes: &[usize]) -> SmallVec<[usize; 8]> {
        axes.iter().map(|&i| self.coords[i]).collect()
    }

    /// Replace components `start..start + count` with a single component.
    pub fn merge_range(&self, start: usize, count: usize, merged: usize) -> Self {
        Self::collect_from(
            self.coords[..start]
                .iter()
                .copied()
                .chain(std::iter::once(merged))
                .chain(self.coords[start + count..].iter().copied()),
        )
    }

    /// Replace the component at `axis` with several components.
    pub fn expand_at(&self, axis: usize, parts: &[usize]) -> Self {
        Self::collect_from(
            self.coords[..axis]
                .iter()
                .chain(parts.iter())
                .chain(self.coords[axis + 1..].iter())
                .copied(),
        )
    }
}

impl std::ops::Index<usize> for BlockLabel {
    type Output = usize;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.coords[index]
    }
}

impl PartialEq for BlockLabel {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: check hash first
        self.hash == other.hash && self.coords == other.coords
    }
}

impl Eq for BlockLabel {}

impl Hash for BlockLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for BlockLabel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BlockLabel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.coords.cmp(&other.coords)
    }
}

impl std::fmt::Display for BlockLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Block(")?;
        for (i, &c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

/// FNV-1a over the chunk indices.
fn compute_hash(coords: &[usize]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    coords.iter().fold(FNV_OFFSET, |hash, &coord| {
        (hash ^ coord as u64).wrapping_mul(FNV_PRIME)
    })
}

impl<const N: usize> From<[usize; N]> for BlockLabel {
    fn from(coords: [usize; N]) -> Self {
        Self::new(&coords)
    }
}

impl From<&[usize]> for BlockLabel {
    fn from(coords: &[usize]) -> Self {
        Self::new(coords)
    }
}

impl From<Vec<usize>> for BlockLabel {
    fn from(coords: Vec<usize>) -> Self {
        Self::new(&coords)
    }
}
