//! Block-sparse SVD: reconstruction, isometries, truncation and agreement
//! with the dense decomposition.

use approx::assert_relative_eq;
use blocktensors::decomposition::svd;
use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces, Qn};
use blocktensors::{
    BlockSparseTensor, BlockSvdResult, DenseTensor, TensorError, TruncationParams, contract_blocksparse,
    svd_blocksparse,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn q(charge: i32) -> Qn {
    Qn::new(&[charge])
}

/// Rank-3 tensor `[bond, site, bond]` with every flux-zero block filled.
fn charged_tensor(seed: u64) -> BlockSparseTensor<f64> {
    let bond = IndexSpace::with_qns(vec![1, 2, 1], vec![q(-1), q(0), q(1)]).unwrap();
    let site = IndexSpace::with_qns(vec![1, 1], vec![q(1), q(-1)]).unwrap();
    let spaces = IndexSpaces::new(vec![bond.clone(), site, bond]);
    let skeleton: BlockSparseTensor<f64> = BlockSparseTensor::zeros_with_flux(spaces.clone(), &Qn::zero()).unwrap();
    let labels: Vec<BlockLabel> = skeleton.offsets().labels().cloned().collect();

    let mut rng = StdRng::seed_from_u64(seed);
    BlockSparseTensor::randn_with_rng(&labels, spaces, &mut rng).unwrap()
}

/// `U * S * V^H` for a split of a rank-3 tensor into rows `[0, 1]` and column `[2]`.
fn reconstruct(result: &BlockSvdResult<f64>) -> BlockSparseTensor<f64> {
    let us = contract_blocksparse(&result.u, &[1, 2, -1], &result.s, &[-1, 3]).unwrap();
    contract_blocksparse(&us, &[1, 2, -1], &result.v.conj(), &[3, -1]).unwrap()
}

fn assert_identity(t: &DenseTensor<f64>) {
    let n = t.shape()[0];
    assert_eq!(t.shape(), &[n, n]);
    for i in 0..n {
        for j in 0..n {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_relative_eq!(*t.get(&[i, j]).unwrap(), expected, epsilon = 1e-12);
        }
    }
}

fn pooled_spectrum(result: &BlockSvdResult<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = result.spectrum.iter().flatten().copied().collect();
    values.sort_by(|a, b| b.total_cmp(a));
    values
}

// ============================================================================
// Exact decomposition
// ============================================================================

#[test]
fn test_charged_tensor_reconstructs() {
    let t = charged_tensor(1);
    let result = svd_blocksparse(&t, &[0, 1], &[2], &TruncationParams::default()).unwrap();

    assert_eq!(result.rank(), 4);
    assert_eq!(result.truncation_error, 0.0);
    assert!(result.u.spaces()[2].has_qns());

    let back = reconstruct(&result);
    for (x, y) in back.to_dense().data().iter().zip(t.to_dense().data()) {
        assert_relative_eq!(x, y, epsilon = 1e-12);
    }
}

#[test]
fn test_factors_are_isometries() {
    let result = svd_blocksparse(&charged_tensor(2), &[0, 1], &[2], &TruncationParams::default()).unwrap();

    let uu = contract_blocksparse(&result.u.conj(), &[-1, -2, 1], &result.u, &[-1, -2, 2]).unwrap();
    assert_identity(&uu.to_dense());

    let vv = contract_blocksparse(&result.v.conj(), &[-1, 1], &result.v, &[-1, 2]).unwrap();
    assert_identity(&vv.to_dense());
}

#[test]
fn test_spectrum_matches_dense_svd() {
    let t = charged_tensor(3);
    let result = svd_blocksparse(&t, &[0, 1], &[2], &TruncationParams::default()).unwrap();
    let dense = svd(&t.to_dense(), &[0, 1], &[2]).unwrap();

    let values = pooled_spectrum(&result);
    for (k, &s) in dense.s.data().iter().enumerate() {
        match values.get(k) {
            Some(&v) => assert_relative_eq!(v, s, epsilon = 1e-12),
            None => assert!(s.abs() < 1e-12),
        }
    }
}

#[test]
fn test_block_structure_is_preserved() {
    let spaces = IndexSpaces::new(vec![
        IndexSpace::new(vec![2, 3]).unwrap(),
        IndexSpace::new(vec![4, 2]).unwrap(),
    ]);
    let mut rng = StdRng::seed_from_u64(4);
    let t = BlockSparseTensor::<f64>::randn_with_rng(
        &[BlockLabel::new(&[0, 1]), BlockLabel::new(&[1, 0])],
        spaces,
        &mut rng,
    )
    .unwrap();

    let result = svd_blocksparse(&t, &[0], &[1], &TruncationParams::default()).unwrap();
    assert_eq!(result.u.nonzero_block_count(), 2);
    assert_eq!(result.s.nonzero_block_count(), 2);
    assert_eq!(result.v.nonzero_block_count(), 2);
    for block in result.s.iter_blocks() {
        assert_eq!(block.label.coords()[0], block.label.coords()[1]);
    }
}

// ============================================================================
// Truncation
// ============================================================================

#[test]
fn test_max_rank_truncation_reports_discarded_weight() {
    let t = charged_tensor(5);
    let full = pooled_spectrum(&svd_blocksparse(&t, &[0, 1], &[2], &TruncationParams::default()).unwrap());

    let params = TruncationParams::new().with_max_rank(2);
    let result = svd_blocksparse(&t, &[0, 1], &[2], &params).unwrap();
    assert_eq!(result.rank(), 2);
    assert_eq!(result.s.spaces()[0].dim(), 2);

    let total: f64 = full.iter().map(|s| s * s).sum();
    let discarded: f64 = full[2..].iter().map(|s| s * s).sum();
    assert_relative_eq!(result.truncation_error, discarded / total, epsilon = 1e-12);
    assert_eq!(pooled_spectrum(&result), full[..2].to_vec());
}

#[test]
fn test_cutoff_bounds_truncation_error() {
    let t = charged_tensor(6);
    let params = TruncationParams::new().with_cutoff(0.2);
    let result = svd_blocksparse(&t, &[0, 1], &[2], &params).unwrap();

    assert!(result.rank() >= 1);
    assert!(result.truncation_error <= 0.2);

    let norm_sqr = t.norm_sqr();
    let kept: f64 = pooled_spectrum(&result).iter().map(|s| s * s).sum();
    assert_relative_eq!(kept / norm_sqr, 1.0 - result.truncation_error, epsilon = 1e-12);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_rejects_non_block_diagonal_input() {
    let spaces = IndexSpaces::new(vec![
        IndexSpace::new(vec![2, 3]).unwrap(),
        IndexSpace::new(vec![4, 2]).unwrap(),
    ]);
    let t: BlockSparseTensor<f64> =
        BlockSparseTensor::zeros(&[BlockLabel::new(&[0, 0]), BlockLabel::new(&[0, 1])], spaces).unwrap();

    assert!(matches!(
        svd_blocksparse(&t, &[0], &[1], &TruncationParams::default()),
        Err(TensorError::NonBlockDiagonalInput { .. })
    ));
}

#[test]
fn test_rejects_bad_axis_groups() {
    let t = charged_tensor(7);
    assert!(matches!(
        svd_blocksparse(&t, &[0, 1], &[1], &TruncationParams::default()),
        Err(TensorError::InvalidPermutation { .. })
    ));
    assert!(matches!(
        svd_blocksparse(&t, &[0, 1, 2], &[], &TruncationParams::default()),
        Err(TensorError::InvalidPermutation { .. })
    ));
}
