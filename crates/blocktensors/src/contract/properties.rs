//! Contraction layout analysis.
//!
//! `ContractionProperties` reduces a label-based contraction to one matrix
//! product: which axes are contracted, how A, B and C must be permuted, and
//! the GEMM dimensions `(dleft, dmid, dright)`. The same analysis serves the
//! dense kernel and every block pair of a block-sparse contraction.

use crate::error::TensorError;

/// Properties computed for a contraction `C = A * B` over shared labels.
///
/// - `dleft` = product of A's uncontracted dimensions
/// - `dmid` = product of contracted dimensions
/// - `dright` = product of B's uncontracted dimensions
///
/// The contraction becomes `C(dleft, dright) = A(dleft, dmid) * B(dmid, dright)`.
#[derive(Debug, Clone)]
pub struct ContractionProperties {
    /// Contracted axis pairs: (axis in A, axis in B), in order of A.
    pub contracted_pairs: Vec<(usize, usize)>,

    /// Axes of A that are not contracted (appear in output).
    pub uncontracted_a: Vec<usize>,

    /// Axes of B that are not contracted (appear in output).
    pub uncontracted_b: Vec<usize>,

    pub permute_a: bool,
    pub permute_b: bool,
    pub permute_c: bool,

    pub dleft: usize,
    pub dmid: usize,
    pub dright: usize,

    /// Permutation for A: [uncontracted..., contracted...]
    pub perm_a: Vec<usize>,

    /// Permutation for B: [contracted..., uncontracted...]
    pub perm_b: Vec<usize>,

    /// Permutation taking the GEMM output to ascending label order.
    pub perm_c: Vec<usize>,

    /// Output labels in the order they appear after GEMM (before perm_c).
    pub output_labels: Vec<i32>,
}

impl ContractionProperties {
    /// Compute contraction properties from labels and shapes.
    ///
    /// Negative labels shared by both tensors are contracted; all other
    /// labels appear in the output, sorted ascending.
    ///
    /// # Example
    ///
    /// ```
    /// use blocktensors::contract::ContractionProperties;
    ///
    /// // C[i,k] = A[i,j] * B[j,k]
    /// let props = ContractionProperties::compute(
    ///     &[1, -1], &[2, 3],
    ///     &[-1, 2], &[3, 4],
    /// );
    ///
    /// assert_eq!(props.dleft, 2);
    /// assert_eq!(props.dmid, 3);
    /// assert_eq!(props.dright, 4);
    /// ```
    pub fn compute(
        labels_a: &[i32],
        shape_a: &[usize],
        labels_b: &[i32],
        shape_b: &[usize],
    ) -> Self {
        let mut contracted_pairs = Vec::new();
        for (i, &la) in labels_a.iter().enumerate() {
            if la < 0 {
                if let Some(j) = labels_b.iter().position(|&lb| lb == la) {
                    contracted_pairs.push((i, j));
                }
            }
        }

        let contracted_a: Vec<usize> = contracted_pairs.iter().map(|&(i, _)| i).collect();
        let contracted_b: Vec<usize> = contracted_pairs.iter().map(|&(_, j)| j).collect();

        let uncontracted_a: Vec<usize> = (0..labels_a.len())
            .filter(|i| !contracted_a.contains(i))
            .collect();
        let uncontracted_b: Vec<usize> = (0..labels_b.len())
            .filter(|j| !contracted_b.contains(j))
            .collect();

        let dleft: usize = uncontracted_a.iter().map(|&i| shape_a[i]).product();
        let dmid: usize = contracted_a.iter().map(|&i| shape_a[i]).product();
        let dright: usize = uncontracted_b.iter().map(|&j| shape_b[j]).product();

        let perm_a: Vec<usize> = uncontracted_a
            .iter()
            .chain(contracted_a.iter())
            .copied()
            .collect();
        let permute_a = !is_identity_perm(&perm_a);

        let perm_b: Vec<usize> = contracted_b
            .iter()
            .chain(uncontracted_b.iter())
            .copied()
            .collect();
        let permute_b = !is_identity_perm(&perm_b);

        let output_labels: Vec<i32> = uncontracted_a
            .iter()
            .map(|&i| labels_a[i])
            .chain(uncontracted_b.iter().map(|&j| labels_b[j]))
            .collect();

        // perm_c[new_pos] = position of the new_pos-th smallest label
        let mut perm_c: Vec<usize> = (0..output_labels.len()).collect();
        perm_c.sort_by_key(|&i| output_labels[i]);
        let permute_c = !is_identity_perm(&perm_c);

        Self {
            contracted_pairs,
            uncontracted_a,
            uncontracted_b,
            permute_a,
            permute_b,
            permute_c,
            dleft,
            dmid,
            dright,
            perm_a,
            perm_b,
            perm_c,
            output_labels,
        }
    }

    /// Axes of A that are contracted, in pair order.
    pub fn contracted_a(&self) -> Vec<usize> {
        self.contracted_pairs.iter().map(|&(i, _)| i).collect()
    }

    /// Axes of B that are contracted, in pair order.
    pub fn contracted_b(&self) -> Vec<usize> {
        self.contracted_pairs.iter().map(|&(_, j)| j).collect()
    }

    /// Check if this is an outer product (no contracted indices).
    pub fn is_outer_product(&self) -> bool {
        self.contracted_pairs.is_empty()
    }

    /// Check if this is a full contraction (scalar result).
    pub fn is_full_contraction(&self) -> bool {
        self.uncontracted_a.is_empty() && self.uncontracted_b.is_empty()
    }
}

/// Check that each tensor has one label per axis.
pub(crate) fn check_label_counts(
    labels_a: &[i32],
    ndim_a: usize,
    labels_b: &[i32],
    ndim_b: usize,
) -> Result<(), TensorError> {
    if labels_a.len() != ndim_a {
        return Err(TensorError::WrongNumberOfIndices {
            expected: ndim_a,
            actual: labels_a.len(),
        });
    }
    if labels_b.len() != ndim_b {
        return Err(TensorError::WrongNumberOfIndices {
            expected: ndim_b,
            actual: labels_b.len(),
        });
    }
    Ok(())
}

pub(crate) fn is_identity_perm(perm: &[usize]) -> bool {
    perm.iter().enumerate().all(|(i, &p)| i == p)
}
