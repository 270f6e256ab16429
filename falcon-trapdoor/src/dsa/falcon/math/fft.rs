//! Negacyclic Fourier transforms over R[x]/(x^n + 1).
//!
//! A length-n polynomial is mapped to its evaluations at the n roots of x^n + 1. The same
//! recursive transform serves two fields:
//! - [Complex64], giving the floating-point FFT used by the solver, the LDL tree and the sampler;
//! - [FalconFelt], giving the NTT modulo q used for invertibility tests and public keys.
//!
//! Roots are ordered so that the evaluations at `w` and `-w` sit next to each other. If `k(n)`
//! lists the exponents of a primitive 2n-th root `psi_2n` for the roots of x^n + 1, then
//! `k(1) = [1]`, `k(2m)[2j] = k(m)[j]` and `k(2m)[2j + 1] = k(m)[j] + 2m`. With that ordering a
//! transform splits into the transforms of the even and odd halves of the polynomial, which is
//! what [FastFft::split_fft] and [FastFft::merge_fft] expose.

use alloc::vec::Vec;
use core::{
    f64::consts::PI,
    ops::{Add, Neg, Sub},
};

use num_complex::Complex64;

use super::{FalconFelt, Inverse, Polynomial, TrapdoorError};

// FIELD ABSTRACTION
// ================================================================================================

/// A field containing the 2n-th roots of unity for the ring degrees in use.
pub trait CyclotomicFourier:
    Inverse + Add<Output = Self> + Sub<Output = Self> + Neg<Output = Self>
{
    /// Returns `psi_2n^k` for a fixed primitive 2n-th root of unity `psi_2n`, chosen so that
    /// `psi_2n^2 = psi_n`.
    fn root(n: usize, k: usize) -> Self;

    /// The inverse of 2.
    fn half() -> Self;
}

impl CyclotomicFourier for Complex64 {
    fn root(n: usize, k: usize) -> Self {
        Complex64::from_polar(1.0, PI * k as f64 / n as f64)
    }

    fn half() -> Self {
        Complex64::new(0.5, 0.0)
    }
}

impl CyclotomicFourier for FalconFelt {
    fn root(n: usize, k: usize) -> Self {
        FalconFelt::negacyclic_root(n).pow(k as u32)
    }

    fn half() -> Self {
        // 2 * 6145 = q + 1
        FalconFelt::new(6145)
    }
}

/// Exponents `k(n)` of the roots of x^n + 1, in transform order.
fn root_exponents(n: usize) -> Vec<usize> {
    let mut exponents = vec![1];
    let mut m = 1;
    while m < n {
        exponents = exponents.iter().flat_map(|&k| [k, k + 2 * m]).collect();
        m *= 2;
    }
    exponents
}

/// All powers of `psi_2n` next to the transform order `k(n)`, computed once per transform of
/// length n and shared by every level of its recursion.
///
/// A level of length m = n / s finds its roots in the same table, since `k(n)[i * s] = k(m)[i]`
/// and `psi_2m = psi_2n^s`.
struct RootTable<F> {
    powers: Vec<F>,
    exponents: Vec<usize>,
}

impl<F: CyclotomicFourier> RootTable<F> {
    fn new(n: usize) -> Self {
        Self {
            powers: (0..2 * n).map(|k| F::root(n, k)).collect(),
            exponents: root_exponents(n),
        }
    }

    /// Exponent of the twiddle `w_j`, the root at position 2j of a level of length m.
    fn exponent(&self, m: usize, j: usize) -> usize {
        let stride = self.exponents.len() / m;
        self.exponents[2 * j * stride] * stride
    }

    fn twiddle(&self, m: usize, j: usize) -> F {
        self.powers[self.exponent(m, j)]
    }

    fn twiddle_inv(&self, m: usize, j: usize) -> F {
        // w^-1 = psi^(2n - k)
        self.powers[self.powers.len() - self.exponent(m, j)]
    }
}

/// The twiddles of a single level of length n, for callers that do not recurse.
fn level_twiddles<F: CyclotomicFourier>(n: usize, invert: bool) -> Vec<F> {
    if n < 2 {
        return Vec::new();
    }
    // k(n)[2j] = k(n / 2)[j]
    root_exponents(n / 2)
        .into_iter()
        .map(|k| if invert { F::root(n, 2 * n - k) } else { F::root(n, k) })
        .collect()
}

// FAST FFT
// ================================================================================================

/// Forward and inverse negacyclic transforms with the halving operations the recursive
/// algorithms are built on.
pub trait FastFft: Sized {
    /// Evaluates the polynomial at the roots of x^n + 1.
    fn fft(&self) -> Result<Self, TrapdoorError>;

    /// Interpolates a polynomial from its evaluations.
    fn ifft(&self) -> Result<Self, TrapdoorError>;

    /// Given the transform of f = f0(x^2) + x * f1(x^2), returns the transforms of f0 and f1.
    ///
    /// The input length must be at least 2.
    fn split_fft(&self) -> (Self, Self);

    /// Inverse of [FastFft::split_fft]; both inputs must have the same length.
    fn merge_fft(f0: &Self, f1: &Self) -> Self;
}

impl<F: CyclotomicFourier> FastFft for Polynomial<F> {
    fn fft(&self) -> Result<Self, TrapdoorError> {
        let n = self.ring_degree()?;
        Ok(Polynomial::new(forward(&self.coefficients, &RootTable::new(n))))
    }

    fn ifft(&self) -> Result<Self, TrapdoorError> {
        let n = self.ring_degree()?;
        Ok(Polynomial::new(inverse(&self.coefficients, &RootTable::new(n))))
    }

    fn split_fft(&self) -> (Self, Self) {
        let w_inv = level_twiddles(self.len(), true);
        let (f0, f1) = split(&self.coefficients, |j| w_inv[j]);
        (Polynomial::new(f0), Polynomial::new(f1))
    }

    fn merge_fft(f0: &Self, f1: &Self) -> Self {
        let w = level_twiddles(2 * f0.len(), false);
        Polynomial::new(merge(&f0.coefficients, &f1.coefficients, |j| w[j]))
    }
}

fn forward<F: CyclotomicFourier>(coefficients: &[F], roots: &RootTable<F>) -> Vec<F> {
    let n = coefficients.len();
    if n == 1 {
        return coefficients.to_vec();
    }
    let even: Vec<F> = coefficients.iter().step_by(2).copied().collect();
    let odd: Vec<F> = coefficients.iter().skip(1).step_by(2).copied().collect();
    merge(&forward(&even, roots), &forward(&odd, roots), |j| roots.twiddle(n, j))
}

fn inverse<F: CyclotomicFourier>(values: &[F], roots: &RootTable<F>) -> Vec<F> {
    let n = values.len();
    if n == 1 {
        return values.to_vec();
    }
    let (f0, f1) = split(values, |j| roots.twiddle_inv(n, j));
    let (even, odd) = (inverse(&f0, roots), inverse(&f1, roots));
    even.into_iter().zip(odd).flat_map(|(e, o)| [e, o]).collect()
}

fn merge<F: CyclotomicFourier>(f0: &[F], f1: &[F], w: impl Fn(usize) -> F) -> Vec<F> {
    let mut f = Vec::with_capacity(2 * f0.len());
    for (j, (&a, &b)) in f0.iter().zip(f1.iter()).enumerate() {
        let t = w(j) * b;
        f.push(a + t);
        f.push(a - t);
    }
    f
}

fn split<F: CyclotomicFourier>(f: &[F], w_inv: impl Fn(usize) -> F) -> (Vec<F>, Vec<F>) {
    let half = F::half();
    let mut f0 = Vec::with_capacity(f.len() / 2);
    let mut f1 = Vec::with_capacity(f.len() / 2);
    for (j, pair) in f.chunks_exact(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        f0.push((a + b) * half);
        f1.push((a - b) * half * w_inv(j));
    }
    (f0, f1)
}

// FFT-DOMAIN HELPERS
// ================================================================================================

impl Polynomial<Complex64> {
    /// Embeds real coefficients as complex numbers.
    pub fn from_real(p: &Polynomial<f64>) -> Self {
        p.map(|&c| Complex64::new(c, 0.0))
    }

    /// Real parts of the coefficients.
    pub fn real_parts(&self) -> Polynomial<f64> {
        self.map(|c| c.re)
    }

    /// The Hermitian adjoint in the FFT domain, i.e. the pointwise conjugate.
    pub fn adjoint_fft(&self) -> Self {
        self.map(|c| c.conj())
    }
}

impl Polynomial<i64> {
    /// Floating-point FFT of an integer polynomial.
    pub fn to_fft(&self) -> Result<Polynomial<Complex64>, TrapdoorError> {
        Polynomial::<Complex64>::from_real(&self.to_f64()).fft()
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;
    use rstest::rstest;

    use super::*;

    fn random_poly(n: usize, rng: &mut impl Rng) -> Polynomial<i64> {
        Polynomial::new((0..n).map(|_| rng.random_range(-100..=100)).collect())
    }

    fn assert_close(a: &Polynomial<Complex64>, b: &Polynomial<Complex64>, tol: f64) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.coefficients.iter().zip(b.coefficients.iter()) {
            assert!((x - y).norm() < tol, "{x} differs from {y}");
        }
    }

    #[test]
    fn root_exponents_follow_the_recursive_order() {
        assert_eq!(root_exponents(1), vec![1]);
        assert_eq!(root_exponents(2), vec![1, 3]);
        assert_eq!(root_exponents(4), vec![1, 5, 3, 7]);
    }

    #[test]
    fn root_table_serves_every_level() {
        let n = 64;
        let table = RootTable::<FalconFelt>::new(n);
        let mut m = 2;
        while m <= n {
            let w = level_twiddles::<FalconFelt>(m, false);
            let w_inv = level_twiddles::<FalconFelt>(m, true);
            for j in 0..m / 2 {
                assert_eq!(table.twiddle(m, j), w[j]);
                assert_eq!(table.twiddle_inv(m, j), w_inv[j]);
                assert_eq!(w[j] * w_inv[j], FalconFelt::new(1));
            }
            m *= 2;
        }
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(8)]
    #[case(512)]
    #[case(1024)]
    fn ifft_inverts_fft(#[case] n: usize) {
        let mut rng = ChaCha20Rng::from_seed([7; 32]);
        let p = Polynomial::<Complex64>::from_real(&random_poly(n, &mut rng).to_f64());
        let round_trip = p.fft().unwrap().ifft().unwrap();
        assert_close(&round_trip, &p, 1e-9);
    }

    #[rstest]
    #[case(2)]
    #[case(16)]
    #[case(256)]
    fn split_and_merge_track_even_and_odd_parts(#[case] n: usize) {
        let mut rng = ChaCha20Rng::from_seed([3; 32]);
        let p = random_poly(n, &mut rng);
        let p_fft = p.to_fft().unwrap();

        let (f0, f1) = p_fft.split_fft();
        let (even, odd) = p.split_parity();
        assert_close(&f0, &even.to_fft().unwrap(), 1e-9);
        assert_close(&f1, &odd.to_fft().unwrap(), 1e-9);
        assert_close(&Polynomial::merge_fft(&f0, &f1), &p_fft, 1e-9);
    }

    #[test]
    fn fft_product_matches_ring_product() {
        let mut rng = ChaCha20Rng::from_seed([11; 32]);
        let a = random_poly(64, &mut rng);
        let b = random_poly(64, &mut rng);
        let expected = a.karamul(&b).unwrap();
        let product = a.to_fft().unwrap().hadamard_mul(&b.to_fft().unwrap()).ifft().unwrap();
        for (x, &y) in product.coefficients.iter().zip(expected.coefficients.iter()) {
            assert!((x.re - y as f64).abs() < 1e-6);
            assert!(x.im.abs() < 1e-6);
        }
    }

    #[test]
    fn adjoint_is_pointwise_conjugate() {
        let mut rng = ChaCha20Rng::from_seed([5; 32]);
        let a = random_poly(32, &mut rng);
        assert_close(&a.adjoint().to_fft().unwrap(), &a.to_fft().unwrap().adjoint_fft(), 1e-9);
    }

    #[test]
    fn ntt_product_matches_ring_product_mod_q() {
        let mut rng = ChaCha20Rng::from_seed([13; 32]);
        let a = random_poly(512, &mut rng);
        let b = random_poly(512, &mut rng);
        let expected = a.mul_negacyclic(&b).unwrap().to_field();
        let product = a
            .to_field()
            .fft()
            .unwrap()
            .hadamard_mul(&b.to_field().fft().unwrap())
            .ifft()
            .unwrap();
        assert_eq!(product, expected);
    }

    #[test]
    fn fft_rejects_non_power_of_two() {
        let p = Polynomial::new(vec![Complex64::new(1.0, 0.0); 3]);
        assert_matches!(p.fft(), Err(TrapdoorError::InvalidDegree(3)));
    }
}
