//! Truncation parameters for singular value decompositions.

/// How many singular values an SVD keeps.
///
/// The default keeps everything. Rules combine: at most `max_rank` values
/// survive, then the smallest are dropped while the discarded squared weight
/// stays within `cutoff`, never going below `min_rank`.
///
/// ```
/// use blocktensors::decomposition::TruncationParams;
///
/// let params = TruncationParams::new().with_max_rank(16).with_cutoff(1e-10);
/// assert_eq!(params.max_rank, Some(16));
/// assert_eq!(params.min_rank, 1);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TruncationParams {
    /// Upper bound on the number of kept values.
    pub max_rank: Option<usize>,
    /// Values always kept when available.
    pub min_rank: usize,
    /// Bound on the discarded squared weight.
    pub cutoff: Option<f64>,
    /// Compare `cutoff` with the absolute discarded weight instead of the
    /// weight relative to the total.
    pub absolute_cutoff: bool,
}

impl Default for TruncationParams {
    fn default() -> Self {
        Self {
            max_rank: None,
            min_rank: 1,
            cutoff: None,
            absolute_cutoff: false,
        }
    }
}

impl TruncationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_rank(mut self, max_rank: usize) -> Self {
        self.max_rank = Some(max_rank);
        self
    }

    pub fn with_min_rank(mut self, min_rank: usize) -> Self {
        self.min_rank = min_rank;
        self
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    pub fn with_absolute_cutoff(mut self, absolute: bool) -> Self {
        self.absolute_cutoff = absolute;
        self
    }

    /// Number of values to keep from a descending spectrum, and the
    /// discarded squared weight (relative unless `absolute_cutoff`).
    pub(crate) fn kept_count(&self, sorted_desc: &[f64]) -> (usize, f64) {
        let n = sorted_desc.len();
        let total: f64 = sorted_desc.iter().map(|s| s * s).sum();
        let scale = if self.absolute_cutoff || total == 0.0 { 1.0 } else { total };

        let upper = self.max_rank.map_or(n, |r| r.min(n));
        let lower = self.min_rank.min(upper);
        let mut keep = upper;
        let mut discarded: f64 = sorted_desc[upper..].iter().map(|s| s * s).sum();

        if let Some(cutoff) = self.cutoff {
            while keep > lower {
                let next = sorted_desc[keep - 1] * sorted_desc[keep - 1];
                if (discarded + next) / scale > cutoff {
                    break;
                }
                discarded += next;
                keep -= 1;
            }
        }

        (keep, discarded / scale)
    }
}
