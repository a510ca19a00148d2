//! Random tensor construction.
//!
//! Seeded generators give reproducible fixtures for block kernels.

use rand::Rng;
use rand::distr::StandardUniform;
use rand_distr::StandardNormal;

use crate::blocksparse_tensor::BlockSparseTensor;
use crate::error::TensorError;
use crate::scalar::{Scalar, c64};
use crate::storage::Dense;
use crate::storage::blocksparse::{BlockLabel, IndexSpaces};
use crate::tensor::Tensor;

/// Trait for types that can be randomly sampled from a uniform distribution.
pub trait RandomUniform: Scalar {
    /// Sample a random value from the uniform distribution [0, 1).
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self;
}

impl RandomUniform for f64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }
}

impl RandomUniform for c64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        c64::new(rng.sample(StandardUniform), rng.sample(StandardUniform))
    }
}

/// Trait for types that can be randomly sampled from a normal distribution.
pub trait RandomNormal: Scalar {
    /// Sample a random value from the standard normal distribution.
    fn sample_normal<R: Rng>(rng: &mut R) -> Self;
}

impl RandomNormal for f64 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardNormal)
    }
}

impl RandomNormal for c64 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        // Real and imaginary parts are independent N(0, 1/2) so E|z|^2 = 1
        let scale = std::f64::consts::FRAC_1_SQRT_2;
        c64::new(
            rng.sample::<f64, _>(StandardNormal) * scale,
            rng.sample::<f64, _>(StandardNormal) * scale,
        )
    }
}

impl<ElT: RandomUniform> Tensor<ElT, Dense<ElT>> {
    /// Dense tensor with uniform random values in [0, 1).
    ///
    /// ```
    /// use blocktensors::Tensor;
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let t1: Tensor<f64> = Tensor::random_with_rng(&[2, 3], &mut rng);
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let t2: Tensor<f64> = Tensor::random_with_rng(&[2, 3], &mut rng);
    ///
    /// assert_eq!(t1.data(), t2.data());
    /// ```
    pub fn random_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        let mut t = Self::zeros(shape);
        t.data_mut()
            .iter_mut()
            .for_each(|x| *x = ElT::sample_uniform(rng));
        t
    }
}

impl<ElT: RandomNormal> Tensor<ElT, Dense<ElT>> {
    /// Dense tensor with standard normal random values.
    pub fn randn_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        let mut t = Self::zeros(shape);
        t.data_mut()
            .iter_mut()
            .for_each(|x| *x = ElT::sample_normal(rng));
        t
    }
}

impl<ElT: RandomUniform> BlockSparseTensor<ElT> {
    /// Block-sparse tensor whose given blocks hold uniform values in [0, 1).
    ///
    /// # Errors
    ///
    /// `InvalidBlockLabel` if a label does not fit `spaces`.
    pub fn random_with_rng<R: Rng>(
        labels: &[BlockLabel],
        spaces: IndexSpaces,
        rng: &mut R,
    ) -> Result<Self, TensorError> {
        let mut t = Self::zeros(labels, spaces)?;
        t.data_mut()
            .iter_mut()
            .for_each(|x| *x = ElT::sample_uniform(rng));
        Ok(t)
    }
}

impl<ElT: RandomNormal> BlockSparseTensor<ElT> {
    /// Block-sparse tensor whose given blocks hold standard normal values.
    ///
    /// ```
    /// use blocktensors::BlockSparseTensor;
    /// use blocktensors::storage::blocksparse::{BlockLabel, IndexSpace, IndexSpaces};
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let spaces = IndexSpaces::new(vec![
    ///     IndexSpace::new(vec![2, 3]).unwrap(),
    ///     IndexSpace::new(vec![4, 5]).unwrap(),
    /// ]);
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let t: BlockSparseTensor<f64> =
    ///     BlockSparseTensor::randn_with_rng(&[BlockLabel::new(&[1, 0])], spaces, &mut rng).unwrap();
    /// assert_eq!(t.nonzero_element_count(), 12);
    /// ```
    pub fn randn_with_rng<R: Rng>(
        labels: &[BlockLabel],
        spaces: IndexSpaces,
        rng: &mut R,
    ) -> Result<Self, TensorError> {
        let mut t = Self::zeros(labels, spaces)?;
        t.data_mut()
            .iter_mut()
            .for_each(|x| *x = ElT::sample_normal(rng));
        Ok(t)
    }
}
