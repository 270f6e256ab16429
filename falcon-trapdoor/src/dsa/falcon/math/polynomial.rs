//! Polynomials over the negacyclic ring R[x]/(x^n + 1), n a power of two.
//!
//! The same container is used for exact integer arithmetic during key generation
//! (`Polynomial<BigInt>` and `Polynomial<i64>`), for arithmetic modulo q
//! (`Polynomial<FalconFelt>`) and for FFT-domain vectors (`Polynomial<Complex64>`).

use alloc::vec::Vec;
use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use num::{BigInt, ToPrimitive, Zero};

use super::{FalconFelt, Inverse, TrapdoorError};
use crate::utils::zeroize::{Zeroize, ZeroizeOnDrop};

// RING ELEMENT
// ================================================================================================

/// Coefficient types the exact ring operations are defined over.
pub trait RingElement:
    Clone + Zero + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Neg<Output = Self>
{
}

impl<T> RingElement for T where
    T: Clone
        + Zero
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<Output = T>
        + Neg<Output = T>
{
}

// POLYNOMIAL
// ================================================================================================

/// A polynomial with coefficients of type `F`, lowest degree first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polynomial<F> {
    /// Coefficients of the polynomial, ordered from lowest to highest degree.
    pub coefficients: Vec<F>,
}

impl<F> Polynomial<F> {
    /// Creates a new polynomial from the provided coefficients.
    pub fn new(coefficients: Vec<F>) -> Self {
        Self { coefficients }
    }

    /// Number of coefficients, i.e. the ring degree n for ring elements.
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Returns the length of this polynomial if it is a valid ring degree.
    pub fn ring_degree(&self) -> Result<usize, TrapdoorError> {
        let n = self.len();
        if n.is_power_of_two() { Ok(n) } else { Err(TrapdoorError::InvalidDegree(n)) }
    }

    /// Returns the common ring degree of `self` and `other`.
    pub fn common_degree<G>(&self, other: &Polynomial<G>) -> Result<usize, TrapdoorError> {
        let n = self.ring_degree()?;
        if other.len() != n {
            return Err(TrapdoorError::InvalidDegree(other.len()));
        }
        Ok(n)
    }

    /// Applies a function to each coefficient and returns a new polynomial.
    pub fn map<G, C: FnMut(&F) -> G>(&self, closure: C) -> Polynomial<G> {
        Polynomial::new(self.coefficients.iter().map(closure).collect())
    }

    /// Folds the coefficients using the provided function and initial value.
    pub fn fold<G, C: FnMut(G, &F) -> G>(&self, initial_value: G, closure: C) -> G {
        self.coefficients.iter().fold(initial_value, closure)
    }
}

impl<F: Clone + Zero> Polynomial<F> {
    /// The zero polynomial with `n` coefficients.
    pub fn zeros(n: usize) -> Self {
        Self::new(vec![F::zero(); n])
    }

    /// Embeds a degree-n/2 polynomial into degree n by placing coefficient i at index 2i.
    ///
    /// This is the right inverse of [Polynomial::field_norm] used to climb back out of the
    /// NTRU solver's recursion.
    pub fn lift(&self) -> Self {
        let mut lifted = Self::zeros(2 * self.len());
        for (i, c) in self.coefficients.iter().enumerate() {
            lifted.coefficients[2 * i] = c.clone();
        }
        lifted
    }

    /// Splits into the even-indexed and odd-indexed coefficients.
    pub fn split_parity(&self) -> (Self, Self) {
        let even = self.coefficients.iter().step_by(2).cloned().collect();
        let odd = self.coefficients.iter().skip(1).step_by(2).cloned().collect();
        (Self::new(even), Self::new(odd))
    }

    /// Interleaves two half-length polynomials, inverse of [Polynomial::split_parity].
    pub fn interleave(even: &Self, odd: &Self) -> Self {
        let mut coefficients = Vec::with_capacity(even.len() + odd.len());
        for (e, o) in even.coefficients.iter().zip(odd.coefficients.iter()) {
            coefficients.push(e.clone());
            coefficients.push(o.clone());
        }
        Self::new(coefficients)
    }
}

// EXACT RING OPERATIONS
// ================================================================================================

/// Multiplies two length-n polynomials by recursive Karatsuba, returning the length-2n product
/// before reduction modulo x^n + 1.
///
/// `n` must be a power of two and both slices must hold at least `n` coefficients.
pub fn karatsuba<F: RingElement>(a: &[F], b: &[F], n: usize) -> Vec<F> {
    if n == 1 {
        return vec![a[0].clone() * b[0].clone(), F::zero()];
    }

    let half = n / 2;
    let (a0, a1) = a[..n].split_at(half);
    let (b0, b1) = b[..n].split_at(half);
    let a_sum: Vec<F> = a0.iter().zip(a1).map(|(x, y)| x.clone() + y.clone()).collect();
    let b_sum: Vec<F> = b0.iter().zip(b1).map(|(x, y)| x.clone() + y.clone()).collect();

    let low = karatsuba(a0, b0, half);
    let high = karatsuba(a1, b1, half);
    let mut mid = karatsuba(&a_sum, &b_sum, half);
    for i in 0..n {
        mid[i] = mid[i].clone() - (low[i].clone() + high[i].clone());
    }

    let mut product = vec![F::zero(); 2 * n];
    for i in 0..n {
        product[i] = product[i].clone() + low[i].clone();
        product[i + n] = product[i + n].clone() + high[i].clone();
        product[i + half] = product[i + half].clone() + mid[i].clone();
    }
    product
}

impl<F: RingElement> Polynomial<F> {
    /// Product in Z[x]/(x^n + 1) computed with Karatsuba and a negacyclic fold.
    pub fn karamul(&self, other: &Self) -> Result<Self, TrapdoorError> {
        let n = self.common_degree(other)?;
        let product = karatsuba(&self.coefficients, &other.coefficients, n);
        let (low, high) = product.split_at(n);
        Ok(Self::new(low.iter().zip(high).map(|(l, h)| l.clone() - h.clone()).collect()))
    }

    /// Schoolbook product in R[x]/(x^n + 1).
    pub fn mul_negacyclic(&self, other: &Self) -> Result<Self, TrapdoorError> {
        let n = self.common_degree(other)?;
        let mut result = Self::zeros(n);
        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in other.coefficients.iter().enumerate() {
                let term = a.clone() * b.clone();
                let k = i + j;
                if k < n {
                    result.coefficients[k] = result.coefficients[k].clone() + term;
                } else {
                    result.coefficients[k - n] = result.coefficients[k - n].clone() - term;
                }
            }
        }
        Ok(result)
    }

    /// Image under the automorphism x -> -x: odd-indexed coefficients are negated.
    pub fn galois_conjugate(&self) -> Self {
        Self::new(
            self.coefficients
                .iter()
                .enumerate()
                .map(|(i, c)| if i % 2 == 0 { c.clone() } else { -c.clone() })
                .collect(),
        )
    }

    /// Field norm N(a) = a_e^2 - x * a_o^2 from Z[x]/(x^n + 1) down to Z[x]/(x^(n/2) + 1),
    /// where a = a_e(x^2) + x * a_o(x^2).
    pub fn field_norm(&self) -> Result<Self, TrapdoorError> {
        let n = self.ring_degree()?;
        if n < 2 {
            return Err(TrapdoorError::InvalidDegree(n));
        }
        let half = n / 2;
        let (even, odd) = self.split_parity();
        let even_sq = even.karamul(&even)?;
        let odd_sq = odd.karamul(&odd)?;

        // x * odd_sq modulo x^half + 1 rotates the top coefficient around with a sign flip
        let mut norm = even_sq;
        let c = &mut norm.coefficients;
        for i in 0..half - 1 {
            c[i + 1] = c[i + 1].clone() - odd_sq.coefficients[i].clone();
        }
        c[0] = c[0].clone() + odd_sq.coefficients[half - 1].clone();
        Ok(norm)
    }

    /// Hermitian adjoint f*(x) = f(x^-1) in R[x]/(x^n + 1).
    pub fn adjoint(&self) -> Self {
        let n = self.len();
        let mut coefficients = Vec::with_capacity(n);
        if n > 0 {
            coefficients.push(self.coefficients[0].clone());
            coefficients.extend(self.coefficients[1..].iter().rev().map(|c| -c.clone()));
        }
        Self::new(coefficients)
    }
}

// BIT SIZES
// ================================================================================================

/// Bit length of |a| rounded up to a multiple of 8; zero for zero.
pub fn bitsize(a: &BigInt) -> u64 {
    a.bits().div_ceil(8) * 8
}

/// Largest [bitsize] over the coefficients of `p`.
pub fn poly_bitsize(p: &Polynomial<BigInt>) -> u64 {
    p.fold(0, |acc, c| acc.max(bitsize(c)))
}

// HADAMARD OPERATIONS
// ================================================================================================

impl<F: Inverse> Polynomial<F> {
    /// Multiplies two polynomials coefficient-wise (Hadamard multiplication).
    pub fn hadamard_mul(&self, other: &Self) -> Self {
        Self::new(
            self.coefficients
                .iter()
                .zip(other.coefficients.iter())
                .map(|(&a, &b)| a * b)
                .collect(),
        )
    }

    /// Divides two polynomials coefficient-wise; a zero divisor yields a zero quotient.
    pub fn hadamard_div(&self, other: &Self) -> Self {
        let inverses = F::batch_inverse_or_zero(&other.coefficients);
        Self::new(self.coefficients.iter().zip(inverses).map(|(&a, b)| a * b).collect())
    }

    /// Coefficient-wise inverse.
    pub fn hadamard_inv(&self) -> Self {
        Self::new(F::batch_inverse_or_zero(&self.coefficients))
    }
}

// CONVERSIONS AND NORMS
// ================================================================================================

impl Polynomial<i64> {
    /// Squared Euclidean norm of the coefficient vector.
    pub fn norm_squared(&self) -> i64 {
        self.fold(0, |acc, &c| acc + c * c)
    }

    pub fn to_bigint(&self) -> Polynomial<BigInt> {
        self.map(|&c| BigInt::from(c))
    }

    /// Converts a big-integer polynomial, failing if a coefficient does not fit in an `i64`.
    pub fn try_from_bigint(p: &Polynomial<BigInt>) -> Option<Self> {
        p.coefficients.iter().map(ToPrimitive::to_i64).collect::<Option<Vec<_>>>().map(Self::new)
    }

    /// Reduces every coefficient modulo q.
    pub fn to_field(&self) -> Polynomial<FalconFelt> {
        self.map(|&c| FalconFelt::from(c))
    }

    pub fn to_f64(&self) -> Polynomial<f64> {
        self.map(|&c| c as f64)
    }
}

impl Polynomial<FalconFelt> {
    /// Squared norm of the balanced representatives.
    pub fn norm_squared(&self) -> i64 {
        self.fold(0, |acc, c| {
            let v = c.balanced_value() as i64;
            acc + v * v
        })
    }

    /// Balanced representatives as integers.
    pub fn to_balanced(&self) -> Polynomial<i64> {
        self.map(|c| c.balanced_value() as i64)
    }
}

// ARITHMETIC TRAITS
// ================================================================================================

impl<F: Clone + AddAssign> Add for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn add(self, rhs: Self) -> Self::Output {
        let mut sum = self.clone();
        sum += rhs;
        sum
    }
}

impl<F: Clone + AddAssign> Add for Polynomial<F> {
    type Output = Polynomial<F>;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += &rhs;
        self
    }
}

/// Coefficient-wise sum; the shorter operand is implicitly zero-padded.
impl<F: Clone + AddAssign> AddAssign<&Polynomial<F>> for Polynomial<F> {
    fn add_assign(&mut self, rhs: &Polynomial<F>) {
        let shared = self.len().min(rhs.len());
        for (a, b) in self.coefficients.iter_mut().zip(rhs.coefficients.iter()) {
            *a += b.clone();
        }
        self.coefficients.extend(rhs.coefficients[shared..].iter().cloned());
    }
}

impl<F: Clone + SubAssign + Neg<Output = F>> Sub for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut diff = self.clone();
        diff -= rhs;
        diff
    }
}

impl<F: Clone + SubAssign + Neg<Output = F>> Sub for Polynomial<F> {
    type Output = Polynomial<F>;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= &rhs;
        self
    }
}

impl<F: Clone + SubAssign + Neg<Output = F>> SubAssign<&Polynomial<F>> for Polynomial<F> {
    fn sub_assign(&mut self, rhs: &Polynomial<F>) {
        let shared = self.len().min(rhs.len());
        for (a, b) in self.coefficients.iter_mut().zip(rhs.coefficients.iter()) {
            *a -= b.clone();
        }
        self.coefficients.extend(rhs.coefficients[shared..].iter().cloned().map(|c| -c));
    }
}

impl<F: Clone + Neg<Output = F>> Neg for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn neg(self) -> Self::Output {
        self.map(|c| -c.clone())
    }
}

impl<F: Clone + Neg<Output = F>> Neg for Polynomial<F> {
    type Output = Polynomial<F>;

    fn neg(self) -> Self::Output {
        (&self).neg()
    }
}

impl<F: Clone + Mul<Output = F>> Mul<F> for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn mul(self, scalar: F) -> Self::Output {
        self.map(|c| c.clone() * scalar.clone())
    }
}

// ZEROIZE IMPLEMENTATIONS
// ================================================================================================

impl<F: Zeroize> Zeroize for Polynomial<F> {
    fn zeroize(&mut self) {
        self.coefficients.zeroize();
    }
}

impl<F: Zeroize> ZeroizeOnDrop for Polynomial<F> {}

// TESTS
// ================================================================================================
