//! JSON records of tensors produced by the block-sparse operations.

use blocktensors::operations::combine_axes;
use blocktensors::serialization::{SCHEMA_VERSION, TensorRecord, from_json, to_json};
use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces, Qn};
use blocktensors::{BlockSparseTensor, TensorError, TruncationParams, c64, contract_blocksparse, svd_blocksparse};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn charged_spaces() -> IndexSpaces {
    let q = |c: i32| Qn::new(&[c]);
    let bond = IndexSpace::with_qns(vec![1, 2, 1], vec![q(-1), q(0), q(1)]).unwrap();
    let site = IndexSpace::with_qns(vec![1, 1], vec![q(1), q(-1)]).unwrap();
    IndexSpaces::new(vec![bond.clone(), site, bond])
}

fn charged_tensor(seed: u64) -> BlockSparseTensor<f64> {
    let skeleton: BlockSparseTensor<f64> = BlockSparseTensor::zeros_with_flux(charged_spaces(), &Qn::zero()).unwrap();
    let labels: Vec<BlockLabel> = skeleton.offsets().labels().cloned().collect();
    let mut rng = StdRng::seed_from_u64(seed);
    BlockSparseTensor::randn_with_rng(&labels, charged_spaces(), &mut rng).unwrap()
}

fn roundtrip<ElT>(t: &BlockSparseTensor<ElT>) -> BlockSparseTensor<ElT>
where
    ElT: blocktensors::Scalar + serde::Serialize + serde::de::DeserializeOwned,
{
    from_json(&to_json(t).unwrap()).unwrap()
}

#[test]
fn test_results_of_operations_roundtrip() {
    let t = charged_tensor(1);
    assert_eq!(roundtrip(&t), t);

    let combined = combine_axes(&t, 0, 2).unwrap();
    assert_eq!(roundtrip(&combined), combined);

    let result = svd_blocksparse(&t, &[0, 1], &[2], &TruncationParams::default()).unwrap();
    assert_eq!(roundtrip(&result.u), result.u);
    assert_eq!(roundtrip(&result.s), result.s);

    let tt = contract_blocksparse(&t, &[1, 2, -1], &t, &[-1, 3, 4]).unwrap();
    assert_eq!(roundtrip(&tt), tt);
}

#[test]
fn test_decoded_tensor_is_usable() {
    let t = charged_tensor(2);
    let mut back = roundtrip(&t);

    // Offsets were rebuilt, so element access and materialization still work
    assert_eq!(back.get(&[1, 0, 1]).unwrap(), t.get(&[1, 0, 1]).unwrap());
    let before = back.nonzero_block_count();
    back.set(&[0, 0, 0], 3.0).unwrap();
    assert_eq!(back.nonzero_block_count(), before + 1);
    assert_eq!(back.get(&[0, 0, 0]).unwrap(), 3.0);
}

#[test]
fn test_record_is_plain_json() {
    let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![1, 2]).unwrap()]);
    let mut t: BlockSparseTensor<c64> = BlockSparseTensor::zeros(&[], spaces).unwrap();
    t.set(&[1], c64::new(2.0, -1.0)).unwrap();

    let value: serde_json::Value = serde_json::from_str(&to_json(&t).unwrap()).unwrap();
    assert_eq!(value["schema_version"], SCHEMA_VERSION);
    assert_eq!(value["blocks"], serde_json::json!([[1]]));
    assert_eq!(value["spaces"][0]["chunk_sizes"], serde_json::json!([1, 2]));
    assert_eq!(roundtrip(&t), t);
}

#[test]
fn test_malformed_input() {
    assert!(matches!(
        from_json::<f64>("not json"),
        Err(TensorError::Serialization { .. })
    ));

    let mut record = TensorRecord::from_tensor(&charged_tensor(3));
    record.spaces = IndexSpaces::new(vec![IndexSpace::new(vec![4]).unwrap()]);
    assert!(record.into_tensor().is_err());
}

#[test]
fn test_random_values_keep_their_bits() {
    let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![10, 30]).unwrap(), IndexSpace::new(vec![25]).unwrap()]);
    let labels = [BlockLabel::new(&[0, 0]), BlockLabel::new(&[1, 0])];
    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..20 {
        let mut t: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&labels, spaces.clone()).unwrap();
        t.data_mut().iter_mut().for_each(|x| *x = rng.random::<f64>() * 10.0 - 5.0);

        let back = roundtrip(&t);
        let bits = |t: &BlockSparseTensor<f64>| t.data().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&back), bits(&t));
    }
}

#[test]
fn test_non_finite_values_are_refused() {
    let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![1]).unwrap()]);
    for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
        let mut t: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[], spaces.clone()).unwrap();
        t.set(&[0], value).unwrap();
        assert!(matches!(to_json(&t), Err(TensorError::Serialization { .. })));
    }

    let mut z: BlockSparseTensor<c64> = BlockSparseTensor::zeros(&[], spaces).unwrap();
    z.set(&[0], c64::new(f64::INFINITY, 0.0)).unwrap();
    assert!(matches!(to_json(&z), Err(TensorError::Serialization { .. })));
}

fn finite_f64() -> impl Strategy<Value = f64> {
    any::<u64>()
        .prop_map(f64::from_bits)
        .prop_filter("finite", |x| x.is_finite())
}

proptest! {
    #[test]
    fn prop_real_values_roundtrip_exactly(values in prop::collection::vec(finite_f64(), 1..=12)) {
        let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![values.len()]).unwrap()]);
        let mut t: BlockSparseTensor<f64> = BlockSparseTensor::zeros(&[BlockLabel::new(&[0])], spaces).unwrap();
        t.data_mut().copy_from_slice(&values);

        let back = roundtrip(&t);
        let bits: Vec<u64> = back.data().iter().map(|x| x.to_bits()).collect();
        let expected: Vec<u64> = values.iter().map(|x| x.to_bits()).collect();
        prop_assert_eq!(bits, expected);
    }

    #[test]
    fn prop_complex_values_roundtrip_exactly(
        parts in prop::collection::vec((finite_f64(), finite_f64()), 1..=8),
    ) {
        let spaces = IndexSpaces::new(vec![IndexSpace::new(vec![1, parts.len()]).unwrap()]);
        let mut t: BlockSparseTensor<c64> = BlockSparseTensor::zeros(&[BlockLabel::new(&[1])], spaces).unwrap();
        for (x, &(re, im)) in t.data_mut().iter_mut().zip(&parts) {
            *x = c64::new(re, im);
        }

        let back = roundtrip(&t);
        for (x, &(re, im)) in back.data().iter().zip(&parts) {
            prop_assert_eq!(x.re.to_bits(), re.to_bits());
            prop_assert_eq!(x.im.to_bits(), im.to_bits());
        }
    }
}
