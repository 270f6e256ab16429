//! Arithmetic in the prime field Z/qZ with q = 12289.
//!
//! Elements are stored canonically in `[0, q - 1]`. Lattice vectors are small, so the balanced
//! representative in `[-(q - 1)/2, (q - 1)/2]` is what norms and encodings work with.

use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num::{One, Zero};

use super::Inverse;
use crate::{dsa::falcon::MODULUS, utils::zeroize::Zeroize};

const Q: u32 = MODULUS as u32;

/// Smallest generator of the multiplicative group of Z/qZ.
const GENERATOR: u32 = 11;

// FALCON FIELD ELEMENT
// ================================================================================================

/// An element of Z/qZ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FalconFelt(u16);

impl FalconFelt {
    /// Creates a field element from any unsigned value, reducing it modulo q.
    pub const fn new(value: u16) -> Self {
        Self(value % (Q as u16))
    }

    /// Returns the canonical representative in `[0, q - 1]`.
    pub const fn value(&self) -> u16 {
        self.0
    }

    /// Returns the balanced representative in `[-(q - 1)/2, (q - 1)/2]`.
    pub const fn balanced_value(&self) -> i16 {
        let value = self.0 as i16;
        let half = (Q / 2) as i16;
        if value > half { value - Q as i16 } else { value }
    }

    /// Raises this element to the power `exp` by square-and-multiply.
    pub fn pow(self, mut exp: u32) -> Self {
        let mut base = self.0 as u32;
        let mut acc = 1u32;
        while exp > 0 {
            if exp & 1 == 1 {
                acc = acc * base % Q;
            }
            base = base * base % Q;
            exp >>= 1;
        }
        Self(acc as u16)
    }

    /// Returns a primitive `2n`-th root of unity, i.e. a root of `x^n + 1`.
    ///
    /// Exists for every power of two `n <= 2048` since `2^12` divides `q - 1`.
    pub(crate) fn negacyclic_root(n: usize) -> Self {
        debug_assert!(n.is_power_of_two() && 2 * n <= (Q - 1) as usize);
        Self(GENERATOR as u16).pow((Q - 1) / (2 * n as u32))
    }
}

impl From<i16> for FalconFelt {
    fn from(value: i16) -> Self {
        Self::from(value as i64)
    }
}

impl From<i64> for FalconFelt {
    fn from(value: i64) -> Self {
        Self(value.rem_euclid(Q as i64) as u16)
    }
}

impl From<u16> for FalconFelt {
    fn from(value: u16) -> Self {
        Self::new(value)
    }
}

// ARITHMETIC
// ================================================================================================

impl Add for FalconFelt {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        let sum = self.0 as u32 + rhs.0 as u32;
        Self(if sum >= Q { sum - Q } else { sum } as u16)
    }
}

impl AddAssign for FalconFelt {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for FalconFelt {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl SubAssign for FalconFelt {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for FalconFelt {
    type Output = Self;

    fn neg(self) -> Self::Output {
        if self.0 == 0 { self } else { Self((Q - self.0 as u32) as u16) }
    }
}

impl Mul for FalconFelt {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self((self.0 as u32 * rhs.0 as u32 % Q) as u16)
    }
}

impl MulAssign for FalconFelt {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

/// Division by zero yields zero.
impl Div for FalconFelt {
    type Output = Self;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn div(self, rhs: Self) -> Self::Output {
        self * rhs.inverse_or_zero()
    }
}

impl DivAssign for FalconFelt {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Zero for FalconFelt {
    fn zero() -> Self {
        Self(0)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl One for FalconFelt {
    fn one() -> Self {
        Self(1)
    }
}

impl Inverse for FalconFelt {
    fn inverse_or_zero(self) -> Self {
        // Fermat: a^(q-2) = a^-1, and 0^(q-2) = 0
        self.pow(Q - 2)
    }
}

impl Zeroize for FalconFelt {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_value_is_centered() {
        assert_eq!(FalconFelt::new(0).balanced_value(), 0);
        assert_eq!(FalconFelt::new(6144).balanced_value(), 6144);
        assert_eq!(FalconFelt::new(6145).balanced_value(), -6144);
        assert_eq!(FalconFelt::from(-1i16).value(), 12288);
        assert_eq!(FalconFelt::from(-5i64).balanced_value(), -5);
    }

    #[test]
    fn inverse_multiplies_to_one() {
        for v in [1u16, 2, 3, 7, 4096, 12288] {
            let a = FalconFelt::new(v);
            assert_eq!(a * a.inverse_or_zero(), FalconFelt::one());
        }
        assert_eq!(FalconFelt::zero().inverse_or_zero(), FalconFelt::zero());
    }

    #[test]
    fn generator_is_primitive() {
        let g = FalconFelt::new(GENERATOR as u16);
        assert_ne!(g.pow((Q - 1) / 2), FalconFelt::one());
        assert_ne!(g.pow((Q - 1) / 3), FalconFelt::one());
        assert_eq!(g.pow(Q - 1), FalconFelt::one());
    }

    #[test]
    fn negacyclic_root_has_order_2n() {
        for log_n in 0..=11 {
            let n = 1usize << log_n;
            let psi = FalconFelt::negacyclic_root(n);
            assert_eq!(psi.pow(n as u32), -FalconFelt::one());
        }
    }
}
