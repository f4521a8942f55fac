//! Element types stored in tiles.

use bytemuck::Pod;
use core::fmt::Debug;
use core::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};
use num_complex::Complex;

/// Precision tag carried by a [`Descriptor`](crate::Descriptor).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Precision {
    Single,
    Double,
    ComplexSingle,
    ComplexDouble,
}

impl Precision {
    /// Size in bytes of one element.
    #[inline]
    pub const fn element_size(self) -> usize {
        match self {
            Precision::Single => 4,
            Precision::Double => 8,
            Precision::ComplexSingle => 8,
            Precision::ComplexDouble => 16,
        }
    }

    #[inline]
    pub const fn is_complex(self) -> bool {
        matches!(self, Precision::ComplexSingle | Precision::ComplexDouble)
    }
}

/// Scalar that can be stored in a tile and processed by the kernels.
///
/// Implemented for `f32`, `f64`, `c32` and `c64`.
pub trait TileScalar:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + Pod
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    /// Real counterpart of the scalar.
    type Real: RealScalar;

    const PRECISION: Precision;

    fn zero() -> Self;
    fn one() -> Self;

    fn from_real(value: Self::Real) -> Self;
    /// Builds a scalar from its parts. The imaginary part is dropped for real types.
    fn from_parts(re: Self::Real, im: Self::Real) -> Self;
    fn from_f64(value: f64) -> Self;

    fn conj(self) -> Self;
    fn re(self) -> Self::Real;
    fn im(self) -> Self::Real;

    /// Squared modulus.
    fn abs2(self) -> Self::Real;
    /// Modulus.
    fn abs(self) -> Self::Real;

    fn scale_real(self, factor: Self::Real) -> Self;

    #[inline]
    fn is_zero(self) -> bool {
        self == Self::zero()
    }
}

/// Real scalar.
pub trait RealScalar: TileScalar<Real = Self> + PartialOrd {
    fn sqrt(self) -> Self;
    /// `sqrt(self² + other²)` without undue overflow.
    fn hypot(self, other: Self) -> Self;
    fn is_finite(self) -> bool;
    fn to_f64(self) -> f64;
    /// Smallest positive value whose reciprocal, scaled by the rounding unit, does not overflow.
    fn safe_min() -> Self;
}

macro_rules! impl_real {
    ($ty: ty, $precision: expr) => {
        impl TileScalar for $ty {
            type Real = $ty;

            const PRECISION: Precision = $precision;

            #[inline]
            fn zero() -> Self {
                0.0
            }
            #[inline]
            fn one() -> Self {
                1.0
            }
            #[inline]
            fn from_real(value: Self::Real) -> Self {
                value
            }
            #[inline]
            fn from_parts(re: Self::Real, _: Self::Real) -> Self {
                re
            }
            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }
            #[inline]
            fn conj(self) -> Self {
                self
            }
            #[inline]
            fn re(self) -> Self::Real {
                self
            }
            #[inline]
            fn im(self) -> Self::Real {
                0.0
            }
            #[inline]
            fn abs2(self) -> Self::Real {
                self * self
            }
            #[inline]
            fn abs(self) -> Self::Real {
                <$ty>::abs(self)
            }
            #[inline]
            fn scale_real(self, factor: Self::Real) -> Self {
                self * factor
            }
        }

        impl RealScalar for $ty {
            #[inline]
            fn sqrt(self) -> Self {
                <$ty>::sqrt(self)
            }
            #[inline]
            fn hypot(self, other: Self) -> Self {
                <$ty>::hypot(self, other)
            }
            #[inline]
            fn is_finite(self) -> bool {
                <$ty>::is_finite(self)
            }
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
            #[inline]
            fn safe_min() -> Self {
                <$ty>::MIN_POSITIVE / (0.5 * <$ty>::EPSILON)
            }
        }
    };
}

macro_rules! impl_complex {
    ($real: ty, $precision: expr) => {
        impl TileScalar for Complex<$real> {
            type Real = $real;

            const PRECISION: Precision = $precision;

            #[inline]
            fn zero() -> Self {
                Complex::new(0.0, 0.0)
            }
            #[inline]
            fn one() -> Self {
                Complex::new(1.0, 0.0)
            }
            #[inline]
            fn from_real(value: Self::Real) -> Self {
                Complex::new(value, 0.0)
            }
            #[inline]
            fn from_parts(re: Self::Real, im: Self::Real) -> Self {
                Complex::new(re, im)
            }
            #[inline]
            fn from_f64(value: f64) -> Self {
                Complex::new(value as $real, 0.0)
            }
            #[inline]
            fn conj(self) -> Self {
                Complex::new(self.re, -self.im)
            }
            #[inline]
            fn re(self) -> Self::Real {
                self.re
            }
            #[inline]
            fn im(self) -> Self::Real {
                self.im
            }
            #[inline]
            fn abs2(self) -> Self::Real {
                self.re * self.re + self.im * self.im
            }
            #[inline]
            fn abs(self) -> Self::Real {
                <$real>::hypot(self.re, self.im)
            }
            #[inline]
            fn scale_real(self, factor: Self::Real) -> Self {
                Complex::new(self.re * factor, self.im * factor)
            }
        }
    };
}

impl_real!(f32, Precision::Single);
impl_real!(f64, Precision::Double);
impl_complex!(f32, Precision::ComplexSingle);
impl_complex!(f64, Precision::ComplexDouble);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c64;

    #[test]
    fn element_sizes_match_types() {
        assert_eq!(f32::PRECISION.element_size(), core::mem::size_of::<f32>());
        assert_eq!(f64::PRECISION.element_size(), core::mem::size_of::<f64>());
        assert_eq!(
            <Complex<f32>>::PRECISION.element_size(),
            core::mem::size_of::<Complex<f32>>()
        );
        assert_eq!(c64::PRECISION.element_size(), core::mem::size_of::<c64>());
        assert!(c64::PRECISION.is_complex());
        assert!(!f64::PRECISION.is_complex());
    }

    #[test]
    fn complex_helpers() {
        let z = c64::from_parts(3.0, -4.0);
        assert_eq!(z.abs(), 5.0);
        assert_eq!(z.abs2(), 25.0);
        assert_eq!(z.conj(), c64::new(3.0, 4.0));
        assert_eq!(z.scale_real(2.0), c64::new(6.0, -8.0));
        assert_eq!(f64::from_parts(1.5, 9.0), 1.5);
    }

    #[test]
    fn safe_min_has_a_finite_reciprocal() {
        assert!((1.0 / f64::safe_min()).is_finite());
        assert!((1.0 / f32::safe_min()).is_finite());
        assert!(f64::safe_min() > f64::MIN_POSITIVE);
    }
}
