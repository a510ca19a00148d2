//! Scalar trait for tensor element types.

use faer_traits::ComplexField;
use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

pub use faer::c64;

/// Trait for scalar types supported by blocktensors.
///
/// This trait wraps faer's `ComplexField` with the arithmetic and the few
/// real-valued projections needed by block kernels (norms, singular values).
pub trait Scalar:
    ComplexField
    + Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Returns the additive identity (zero).
    fn zero() -> Self {
        Self::default()
    }

    /// Returns the multiplicative identity (one).
    fn one() -> Self;

    /// Embed a real number.
    fn from_real(value: f64) -> Self;

    /// Real part.
    fn real_part(self) -> f64;

    /// Squared modulus `|x|^2`.
    fn modulus_sqr(self) -> f64;

    /// Complex conjugate (identity for real types).
    fn conjugate(self) -> Self;

    /// True if every real component is finite.
    fn has_finite_parts(self) -> bool;
}

impl Scalar for f64 {
    fn one() -> Self {
        1.0
    }

    fn from_real(value: f64) -> Self {
        value
    }

    fn real_part(self) -> f64 {
        self
    }

    fn modulus_sqr(self) -> f64 {
        self * self
    }

    fn conjugate(self) -> Self {
        self
    }

    fn has_finite_parts(self) -> bool {
        self.is_finite()
    }
}

impl Scalar for c64 {
    fn one() -> Self {
        c64::new(1.0, 0.0)
    }

    fn from_real(value: f64) -> Self {
        c64::new(value, 0.0)
    }

    fn real_part(self) -> f64 {
        self.re
    }

    fn modulus_sqr(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    fn conjugate(self) -> Self {
        c64::new(self.re, -self.im)
    }

    fn has_finite_parts(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}
