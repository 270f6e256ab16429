//! Generation of NTRU bases (f, g, F, G) with f * G - g * F = q.

use alloc::vec::Vec;

use falcon_trapdoor_derive::SilentDebug;
use num::{BigInt, Zero};
use num_complex::Complex64;
use rand::Rng;
use tracing::{debug, warn};

use super::{FalconFelt, FastFft, Polynomial, TrapdoorError, ntru_solve, sampler_z};
use crate::{
    dsa::falcon::MODULUS,
    utils::zeroize::{Zeroize, ZeroizeOnDrop},
};

// CONSTANTS
// ================================================================================================

/// Standard deviation of the samples summed into each coefficient of f and g,
/// 1.17 * sqrt(q / 8192).
const KEYGEN_SIGMA: f64 = 1.43300980528773;

/// Number of base samples spread over the coefficients of one polynomial.
const KEYGEN_SAMPLES: usize = 4096;

/// Candidates whose Gram-Schmidt norm exceeds 1.17^2 * q are rejected.
const GS_NORM_BOUND: f64 = 1.17 * 1.17 * MODULUS as f64;

/// Default number of (f, g) candidates tried before key generation gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

// CONFIGURATION
// ================================================================================================

/// Tunables of [ntru_gen_with_config].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeygenConfig {
    /// Number of (f, g) candidates to try before failing with
    /// [TrapdoorError::KeyGenExhausted].
    pub max_attempts: usize,
}

impl Default for KeygenConfig {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS }
    }
}

// NTRU BASIS
// ================================================================================================

/// Four integer polynomials with f * G - g * F = q modulo x^n + 1.
///
/// (f, g) are short; (F, G) are solved for and size-reduced against them. The coefficients are
/// wiped when the basis is dropped.
#[derive(Clone, PartialEq, Eq, SilentDebug)]
pub struct NtruBasis {
    pub f: Polynomial<i64>,
    pub g: Polynomial<i64>,
    pub big_f: Polynomial<i64>,
    pub big_g: Polynomial<i64>,
}

impl NtruBasis {
    /// Ring degree n.
    pub fn degree(&self) -> usize {
        self.f.len()
    }

    /// Checks f * G - g * F = q exactly, in big-integer arithmetic.
    pub fn satisfies_ntru_equation(&self) -> bool {
        let (f, g) = (self.f.to_bigint(), self.g.to_bigint());
        let (big_f, big_g) = (self.big_f.to_bigint(), self.big_g.to_bigint());
        match (f.karamul(&big_g), g.karamul(&big_f)) {
            (Ok(fg), Ok(gf)) => is_q_constant(&(fg - gf)),
            _ => false,
        }
    }

    /// The public polynomial h = g / f modulo q.
    pub fn public_key_poly(&self) -> Result<Polynomial<FalconFelt>, TrapdoorError> {
        let f_ntt = self.f.to_field().fft()?;
        if f_ntt.coefficients.iter().any(Zero::is_zero) {
            return Err(TrapdoorError::NotInvertible);
        }
        self.g.to_field().fft()?.hadamard_div(&f_ntt).ifft()
    }

    /// The secret basis B = [[g, -f], [G, -F]] in the FFT domain, row-major.
    pub fn fft_basis(&self) -> Result<[Polynomial<Complex64>; 4], TrapdoorError> {
        Ok([
            self.g.to_fft()?,
            (-&self.f).to_fft()?,
            self.big_g.to_fft()?,
            (-&self.big_f).to_fft()?,
        ])
    }
}

impl Zeroize for NtruBasis {
    fn zeroize(&mut self) {
        self.f.zeroize();
        self.g.zeroize();
        self.big_f.zeroize();
        self.big_g.zeroize();
    }
}

impl Drop for NtruBasis {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for NtruBasis {}

// GENERATION
// ================================================================================================

/// Samples a polynomial of degree `n` whose coefficients are each the sum of `4096 / n`
/// discrete Gaussian samples of standard deviation 1.43300980528773.
///
/// `n` must be a power of two below 4096.
pub fn gen_poly<R: Rng>(n: usize, rng: &mut R) -> Result<Polynomial<i64>, TrapdoorError> {
    if !n.is_power_of_two() || n >= KEYGEN_SAMPLES {
        return Err(TrapdoorError::InvalidDegree(n));
    }
    let per_coefficient = KEYGEN_SAMPLES / n;
    let mut coefficients = Vec::with_capacity(n);
    for _ in 0..n {
        let mut sum = 0;
        for _ in 0..per_coefficient {
            sum += sampler_z(0.0, KEYGEN_SIGMA, KEYGEN_SIGMA - 0.001, rng)?;
        }
        coefficients.push(sum);
    }
    Ok(Polynomial::new(coefficients))
}

/// Squared Gram-Schmidt norm of the NTRU lattice basis generated by (f, g):
/// max(||(f, g)||^2, q^2 * ||(g*, f*) / (f f* + g g*)||^2).
pub fn gs_norm(f: &Polynomial<i64>, g: &Polynomial<i64>, q: i64) -> Result<f64, TrapdoorError> {
    f.common_degree(g)?;
    let sqnorm_fg = (f.norm_squared() + g.norm_squared()) as f64;

    let f_fft = f.to_fft()?;
    let g_fft = g.to_fft()?;
    let f_adj = f_fft.adjoint_fft();
    let g_adj = g_fft.adjoint_fft();
    let ffgg = f_fft.hadamard_mul(&f_adj) + g_fft.hadamard_mul(&g_adj);
    let ft = g_adj.hadamard_div(&ffgg).ifft()?;
    let gt = f_adj.hadamard_div(&ffgg).ifft()?;
    let sqnorm_ft_gt = ft.fold(0.0, |acc, c| acc + c.re * c.re)
        + gt.fold(0.0, |acc, c| acc + c.re * c.re);

    let q = q as f64;
    Ok(sqnorm_fg.max(q * q * sqnorm_ft_gt))
}

/// Generates an NTRU basis of degree `n` with the default attempt budget.
pub fn ntru_gen<R: Rng>(n: usize, rng: &mut R) -> Result<NtruBasis, TrapdoorError> {
    ntru_gen_with_config(n, &KeygenConfig::default(), rng)
}

/// Generates an NTRU basis of degree `n`.
///
/// Each attempt samples (f, g) and discards them if the Gram-Schmidt norm is too large, if f
/// is not invertible modulo q, if the solver reports a resampling condition, or if the solution
/// fails the exact equation check. Other solver errors are returned as is.
pub fn ntru_gen_with_config<R: Rng>(
    n: usize,
    config: &KeygenConfig,
    rng: &mut R,
) -> Result<NtruBasis, TrapdoorError> {
    for attempt in 1..=config.max_attempts {
        let f = gen_poly(n, rng)?;
        let g = gen_poly(n, rng)?;

        if gs_norm(&f, &g, MODULUS as i64)? > GS_NORM_BOUND {
            continue;
        }
        if f.to_field().fft()?.coefficients.iter().any(Zero::is_zero) {
            debug!(attempt, "f is not invertible modulo q");
            continue;
        }

        let (f_big, g_big) = (f.to_bigint(), g.to_bigint());
        let (big_f, big_g) = match ntru_solve(&f_big, &g_big) {
            Ok(solution) => solution,
            Err(TrapdoorError::GcdNotOne) => {
                debug!(attempt, "field norms of f and g are not coprime");
                continue;
            },
            Err(err) if err.is_resampling_condition() => {
                warn!(attempt, %err, "NTRU solver failed, resampling");
                continue;
            },
            Err(err) => return Err(err),
        };

        if !is_q_constant(&(f_big.karamul(&big_g)? - g_big.karamul(&big_f)?)) {
            warn!(attempt, "NTRU solution failed the equation check, resampling");
            continue;
        }

        let (Some(big_f), Some(big_g)) =
            (Polynomial::try_from_bigint(&big_f), Polynomial::try_from_bigint(&big_g))
        else {
            warn!(attempt, "NTRU solution does not fit in 64-bit coefficients, resampling");
            continue;
        };

        debug!(attempt, n, "NTRU basis generated");
        return Ok(NtruBasis { f, g, big_f, big_g });
    }

    Err(TrapdoorError::KeyGenExhausted(config.max_attempts))
}

/// True if `p` is the constant polynomial q.
fn is_q_constant(p: &Polynomial<BigInt>) -> bool {
    p.coefficients
        .iter()
        .enumerate()
        .all(|(i, c)| if i == 0 { *c == BigInt::from(MODULUS) } else { c.is_zero() })
}

// TESTS
// ================================================================================================
