//! Conserved quantities attached to axis chunks.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::{Add, Neg};

/// An additive vector of integer charges (e.g. `[2*Sz, N]`).
///
/// Charges of different length compare and add as if the shorter one were
/// padded with zeros, so `Qn::zero()` is the neutral element for any sector.
///
/// ```
/// use blocktensors::storage::blocksparse::Qn;
///
/// let up = Qn::new(&[1, 1]);
/// let down = Qn::new(&[-1, 1]);
/// assert_eq!(up.clone() + down, Qn::new(&[0, 2]));
/// assert_eq!(up.clone() + (-up), Qn::zero());
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qn {
    charges: SmallVec<[i32; 4]>,
}

impl Qn {
    pub fn new(charges: &[i32]) -> Self {
        Self {
            charges: charges.iter().copied().collect(),
        }
    }

    /// The neutral charge.
    pub fn zero() -> Self {
        Self::default()
    }

    #[inline]
    pub fn charges(&self) -> &[i32] {
        &self.charges
    }

    /// True if every charge is zero.
    pub fn is_zero(&self) -> bool {
        self.charges.iter().all(|&c| c == 0)
    }

    /// Charges without trailing zeros, the canonical form used for equality.
    fn trimmed(&self) -> &[i32] {
        let end = self
            .charges
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |p| p + 1);
        &self.charges[..end]
    }
}

impl Add for Qn {
    type Output = Qn;

    fn add(self, rhs: Qn) -> Qn {
        &self + &rhs
    }
}

impl Add<&Qn> for &Qn {
    type Output = Qn;

    fn add(self, rhs: &Qn) -> Qn {
        let len = self.charges.len().max(rhs.charges.len());
        let charges = (0..len)
            .map(|i| {
                self.charges.get(i).copied().unwrap_or(0) + rhs.charges.get(i).copied().unwrap_or(0)
            })
            .collect();
        Qn { charges }
    }
}

impl Neg for Qn {
    type Output = Qn;

    fn neg(self) -> Qn {
        Qn {
            charges: self.charges.iter().map(|&c| -c).collect(),
        }
    }
}

impl std::iter::Sum for Qn {
    fn sum<I: Iterator<Item = Qn>>(iter: I) -> Qn {
        iter.fold(Qn::zero(), |acc, q| acc + q)
    }
}

impl PartialEq for Qn {
    fn eq(&self, other: &Self) -> bool {
        self.trimmed() == other.trimmed()
    }
}

impl Eq for Qn {}

impl std::hash::Hash for Qn {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.trimmed().hash(state);
    }
}

impl PartialOrd for Qn {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Qn {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let len = self.charges.len().max(other.charges.len());
        (0..len)
            .map(|i| {
                let a = self.charges.get(i).copied().unwrap_or(0);
                let b = other.charges.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl std::fmt::Display for Qn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Qn{:?}", self.trimmed())
    }
}

impl<const N: usize> From<[i32; N]> for Qn {
    fn from(charges: [i32; N]) -> Self {
        Self::new(&charges)
    }
}
