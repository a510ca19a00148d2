//! Block-sparse contraction checked against dense contraction.

use approx::assert_relative_eq;
use blocktensors::operations::{common_axes, contraction_labels, uncommon_axes};
use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces, Qn};
use blocktensors::strides::row_major_cartesian;
use blocktensors::{BlockSparseTensor, DenseTensor, TensorError, c64, contract, contract_axes, contract_blocksparse};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn space(chunks: &[usize]) -> IndexSpace {
    IndexSpace::new(chunks.to_vec()).unwrap()
}

/// Random tensor keeping each block with probability `density`.
fn random_blocksparse(spaces: Vec<IndexSpace>, density: f64, rng: &mut StdRng) -> BlockSparseTensor<f64> {
    let spaces = IndexSpaces::new(spaces);
    let extents = spaces.nchunks();
    let total: usize = extents.iter().product();
    let labels: Vec<BlockLabel> = (0..total)
        .filter(|_| rng.random_bool(density))
        .map(|linear| BlockLabel::from(row_major_cartesian(linear, &extents)))
        .collect();
    BlockSparseTensor::randn_with_rng(&labels, spaces, rng).unwrap()
}

/// Random values in every block that carries `flux`.
fn random_with_flux(spaces: IndexSpaces, flux: &Qn, rng: &mut StdRng) -> BlockSparseTensor<f64> {
    let skeleton: BlockSparseTensor<f64> = BlockSparseTensor::zeros_with_flux(spaces.clone(), flux).unwrap();
    let labels: Vec<BlockLabel> = skeleton.offsets().labels().cloned().collect();
    BlockSparseTensor::randn_with_rng(&labels, spaces, rng).unwrap()
}

fn assert_dense_close(actual: &DenseTensor<f64>, expected: &DenseTensor<f64>) {
    assert_eq!(actual.shape(), expected.shape());
    for (x, y) in actual.data().iter().zip(expected.data()) {
        assert_relative_eq!(x, y, epsilon = 1e-12);
    }
}

fn check_against_dense(
    a: &BlockSparseTensor<f64>,
    labels_a: &[i32],
    b: &BlockSparseTensor<f64>,
    labels_b: &[i32],
) {
    let c = contract_blocksparse(a, labels_a, b, labels_b).unwrap();
    let expected = contract(&a.to_dense(), labels_a, &b.to_dense(), labels_b).unwrap();
    assert_dense_close(&c.to_dense(), &expected);
}

// ============================================================================
// Agreement with the dense kernel
// ============================================================================

#[test]
fn test_matrix_product_random_sparsity() {
    let mut rng = StdRng::seed_from_u64(100);
    for _ in 0..5 {
        let a = random_blocksparse(vec![space(&[2, 3]), space(&[1, 2, 2])], 0.6, &mut rng);
        let b = random_blocksparse(vec![space(&[1, 2, 2]), space(&[3, 1])], 0.6, &mut rng);
        check_against_dense(&a, &[1, -1], &b, &[-1, 2]);
    }
}

#[test]
fn test_two_shared_axes_in_different_order() {
    let mut rng = StdRng::seed_from_u64(101);
    let (i, j, k, l) = (space(&[2, 1]), space(&[1, 3]), space(&[2, 2]), space(&[3]));
    let a = random_blocksparse(vec![i, j.clone(), k.clone()], 0.7, &mut rng);
    let b = random_blocksparse(vec![k, l, j], 0.7, &mut rng);

    check_against_dense(&a, &[1, -1, -2], &b, &[-2, 2, -1]);
}

#[test]
fn test_output_axes_follow_label_order() {
    let mut rng = StdRng::seed_from_u64(102);
    let a = random_blocksparse(vec![space(&[2, 3]), space(&[4])], 1.0, &mut rng);
    let b = random_blocksparse(vec![space(&[4]), space(&[1, 1, 1])], 1.0, &mut rng);

    let c = contract_blocksparse(&a, &[2, -1], &b, &[-1, 1]).unwrap();
    assert_eq!(c.shape(), vec![3, 5]);
    check_against_dense(&a, &[2, -1], &b, &[-1, 1]);
}

#[test]
fn test_outer_and_full_contraction() {
    let mut rng = StdRng::seed_from_u64(103);
    let a = random_blocksparse(vec![space(&[1, 2]), space(&[2, 2])], 0.8, &mut rng);
    let b = random_blocksparse(vec![space(&[3]), space(&[1, 1])], 0.8, &mut rng);
    check_against_dense(&a, &[1, 2], &b, &[3, 4]);

    let b = random_blocksparse(vec![space(&[2, 2]), space(&[1, 2])], 0.8, &mut rng);
    let full = contract_blocksparse(&a, &[-1, -2], &b, &[-2, -1]).unwrap();
    assert_eq!(full.shape(), vec![1]);
    check_against_dense(&a, &[-1, -2], &b, &[-2, -1]);
}

#[test]
fn test_complex_against_dense() {
    let spaces_a = IndexSpaces::new(vec![space(&[1, 2]), space(&[2, 1])]);
    let spaces_b = IndexSpaces::new(vec![space(&[2, 1]), space(&[2])]);
    let mut rng = StdRng::seed_from_u64(104);
    let a = BlockSparseTensor::<c64>::randn_with_rng(
        &[BlockLabel::new(&[0, 0]), BlockLabel::new(&[1, 1])],
        spaces_a,
        &mut rng,
    )
    .unwrap();
    let b = BlockSparseTensor::<c64>::randn_with_rng(
        &[BlockLabel::new(&[0, 0]), BlockLabel::new(&[1, 0])],
        spaces_b,
        &mut rng,
    )
    .unwrap();

    let c = contract_blocksparse(&a, &[1, -1], &b, &[-1, 2]).unwrap();
    let expected = contract(&a.to_dense(), &[1, -1], &b.to_dense(), &[-1, 2]).unwrap();
    for (x, y) in c.to_dense().data().iter().zip(expected.data()) {
        assert_relative_eq!(x.re, y.re, epsilon = 1e-12);
        assert_relative_eq!(x.im, y.im, epsilon = 1e-12);
    }
}

// ============================================================================
// Quantum numbers
// ============================================================================

#[test]
fn test_flux_adds_under_contraction() {
    let q = |c: i32| Qn::new(&[c]);
    let site = IndexSpace::with_qns(vec![1, 1], vec![q(1), q(-1)]).unwrap();
    let bond = IndexSpace::with_qns(vec![1, 2, 1], vec![q(-1), q(0), q(1)]).unwrap();
    let bond_dual = IndexSpace::with_qns(vec![1, 2, 1], vec![q(1), q(0), q(-1)]).unwrap();

    let mut rng = StdRng::seed_from_u64(105);
    // a: blocks (0, 0) and (1, 2); b: block (0, 0) only, meeting a on bond chunk 0
    let a = random_with_flux(IndexSpaces::new(vec![site.clone(), bond]), &q(0), &mut rng);
    let b = random_with_flux(IndexSpaces::new(vec![bond_dual, site]), &q(2), &mut rng);
    assert_eq!(a.nonzero_block_count(), 2);
    assert_eq!(b.nonzero_block_count(), 1);

    let c = contract_blocksparse(&a, &[1, -1], &b, &[-1, 2]).unwrap();
    assert_eq!(c.nonzero_block_count(), 1);
    assert!(c.is_block_present(&BlockLabel::new(&[0, 0])));
    for block in c.iter_blocks() {
        assert_eq!(c.block_flux(block.label), Some(q(2)));
    }
    check_against_dense(&a, &[1, -1], &b, &[-1, 2]);
}

#[test]
fn test_neutral_contraction_keeps_flux_zero() {
    let q = |c: i32| Qn::new(&[c]);
    let site = IndexSpace::with_qns(vec![1, 1], vec![q(1), q(-1)]).unwrap();
    let bond = IndexSpace::with_qns(vec![1, 2, 1], vec![q(-1), q(0), q(1)]).unwrap();
    let bond_dual = IndexSpace::with_qns(vec![1, 2, 1], vec![q(1), q(0), q(-1)]).unwrap();

    let mut rng = StdRng::seed_from_u64(107);
    let a = random_with_flux(IndexSpaces::new(vec![site.clone(), bond]), &q(0), &mut rng);
    let b = random_with_flux(IndexSpaces::new(vec![bond_dual, site]), &q(0), &mut rng);

    // Bond chunks 0 and 2 pair up: (0, 0) x (0, 1) and (1, 2) x (2, 0)
    let c = contract_blocksparse(&a, &[1, -1], &b, &[-1, 2]).unwrap();
    assert_eq!(c.nonzero_block_count(), 2);
    assert!(c.is_block_present(&BlockLabel::new(&[0, 1])));
    assert!(c.is_block_present(&BlockLabel::new(&[1, 0])));
    for block in c.iter_blocks() {
        assert_eq!(c.block_flux(block.label), Some(q(0)));
    }
    check_against_dense(&a, &[1, -1], &b, &[-1, 2]);
}

// ============================================================================
// Axis bookkeeping
// ============================================================================

#[test]
fn test_contract_axes_with_identifier_helpers() {
    let ids_a = ["l", "s", "r"];
    let ids_b = ["r", "t", "s"];
    let mut rng = StdRng::seed_from_u64(106);
    let (l, s, r, t) = (space(&[2]), space(&[1, 1]), space(&[2, 3]), space(&[4]));
    let a = random_blocksparse(vec![l, s.clone(), r.clone()], 1.0, &mut rng);
    let b = random_blocksparse(vec![r, t, s], 1.0, &mut rng);

    let (axes_a, axes_b): (Vec<usize>, Vec<usize>) = common_axes(&ids_a, &ids_b).into_iter().unzip();
    assert_eq!(axes_a, vec![1, 2]);
    assert_eq!(axes_b, vec![2, 0]);
    assert_eq!(uncommon_axes(&ids_a, &ids_b), vec![0]);
    assert_eq!(uncommon_axes(&ids_b, &ids_a), vec![1]);

    let by_axes = contract_axes(&a, &axes_a, &b, &axes_b).unwrap();
    let (labels_a, labels_b) = contraction_labels(&ids_a, &ids_b);
    let by_labels = contract_blocksparse(&a, &labels_a, &b, &labels_b).unwrap();

    assert_eq!(by_axes.shape(), vec![2, 4]);
    assert_dense_close(&by_axes.to_dense(), &by_labels.to_dense());
}

#[test]
fn test_mismatched_chunking_is_rejected() {
    let a: BlockSparseTensor<f64> =
        BlockSparseTensor::zeros(&[], IndexSpaces::new(vec![space(&[2]), space(&[2, 3])])).unwrap();
    let b: BlockSparseTensor<f64> =
        BlockSparseTensor::zeros(&[], IndexSpaces::new(vec![space(&[3, 2]), space(&[2])])).unwrap();

    assert_eq!(
        contract_blocksparse(&a, &[1, -1], &b, &[-1, 2]).unwrap_err(),
        TensorError::ContractionAxisMismatch {
            axis_a: 1,
            axis_b: 0,
            chunks_a: vec![2, 3],
            chunks_b: vec![3, 2]
        }
    );
}
