//! GEMM-based dense contraction using faer.
//!
//! Tensors are permuted to `[free..., contracted...]` / `[contracted..., free...]`,
//! viewed as matrices without copying, multiplied, and the product permuted
//! into ascending label order.

use faer::linalg::matmul::matmul;
use faer::{Accum, Par};

use crate::backend::AsFaerMat;
use crate::contract::properties::{ContractionProperties, check_label_counts};
use crate::error::TensorError;
use crate::operations::permutedims;
use crate::scalar::Scalar;
use crate::tensor::DenseTensor;

/// Contract two dense tensors over shared negative labels.
///
/// The result's axes are the uncontracted axes of both inputs ordered by
/// ascending label. A full contraction yields a `[1]` tensor.
///
/// # Errors
///
/// `WrongNumberOfIndices` if a label list does not match its tensor's rank,
/// `ShapeMismatch` if contracted axes differ in size.
///
/// # Example
///
/// ```
/// use blocktensors::{Tensor, contract};
///
/// // C[i,k] = A[i,j] * B[j,k]
/// let a = Tensor::<f64>::ones(&[2, 3]);
/// let b = Tensor::<f64>::ones(&[3, 4]);
///
/// let c = contract(&a, &[1, -1], &b, &[-1, 2]).unwrap();
/// assert_eq!(c.shape(), &[2, 4]);
/// assert_eq!(c.get(&[1, 3]), Some(&3.0));
/// ```
pub fn contract<ElT: Scalar>(
    a: &DenseTensor<ElT>,
    labels_a: &[i32],
    b: &DenseTensor<ElT>,
    labels_b: &[i32],
) -> Result<DenseTensor<ElT>, TensorError> {
    check_label_counts(labels_a, a.ndim(), labels_b, b.ndim())?;

    let props = ContractionProperties::compute(labels_a, a.shape(), labels_b, b.shape());
    for &(i, j) in &props.contracted_pairs {
        if a.shape()[i] != b.shape()[j] {
            return Err(TensorError::ShapeMismatch {
                expected: a.shape()[i],
                actual: b.shape()[j],
            });
        }
    }

    let a_work = if props.permute_a {
        permutedims(a, &props.perm_a)?
    } else {
        a.clone()
    };
    let b_work = if props.permute_b {
        permutedims(b, &props.perm_b)?
    } else {
        b.clone()
    };

    let (m, k, n) = (props.dleft, props.dmid, props.dright);
    let mut c = DenseTensor::<ElT>::zeros(&[m, n]);
    matmul(
        c.as_faer_mat_mut(m, n),
        Accum::Replace,
        a_work.as_faer_mat(m, k),
        b_work.as_faer_mat(k, n),
        ElT::one(),
        Par::Seq,
    );

    let mut output_shape: Vec<usize> = props.uncontracted_a.iter().map(|&i| a.shape()[i]).collect();
    output_shape.extend(props.uncontracted_b.iter().map(|&j| b.shape()[j]));
    if output_shape.is_empty() {
        output_shape.push(1);
    }

    let result = c.reshape(&output_shape)?;
    if props.permute_c {
        permutedims(&result, &props.perm_c)
    } else {
        Ok(result)
    }
}
