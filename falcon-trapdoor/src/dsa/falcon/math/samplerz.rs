//! Discrete Gaussian sampling over the integers.
//!
//! [sampler_z] draws from D_{Z, mu, sigma} for `sigma_min <= sigma <= SIGMA_MAX` by rejection
//! from a half-Gaussian base distribution of standard deviation `SIGMA_MAX`. Acceptance uses a
//! fixed-point Bernoulli trial for `ccs * exp(-x)` ([ber_exp]), built on the polynomial
//! approximation of FACCT ([approx_exp]).
//!
//! The order in which random bytes are consumed matches the Falcon reference sampler: 9 bytes
//! for the base sample, 1 byte for the sign, then 1 byte per step of the Bernoulli trial.

#[cfg(not(feature = "std"))]
use num::Float;
use rand::Rng;

use super::TrapdoorError;

/// Standard deviation of the base half-Gaussian, and the largest sigma [sampler_z] supports.
pub const SIGMA_MAX: f64 = 1.8205;

const INV_2SIGMA_MAX_SQ: f64 = 1.0 / (2.0 * SIGMA_MAX * SIGMA_MAX);

/// Reverse cumulative distribution table of the base half-Gaussian, scaled by 2^72.
const RCDT: [u128; 18] = [
    3024686241123004913666,
    1564742784480091954050,
    636254429462080897535,
    199560484645026482916,
    47667343854657281903,
    8595902006365044063,
    1163297957344668388,
    117656387352093658,
    8867391802663976,
    496969357462633,
    20680885154299,
    638331848991,
    14602316184,
    247426747,
    3104126,
    28824,
    198,
    1,
];

/// Coefficients of the FACCT polynomial approximation of exp(-x) on [0, ln 2], scaled by 2^63.
/// See https://eprint.iacr.org/2018/1234.
const C: [u64; 13] = [
    0x00000004741183a3,
    0x00000036548cfc06,
    0x0000024fdcbf140a,
    0x0000171d939de045,
    0x0000d00cf58f6f84,
    0x000680681cf796e3,
    0x002d82d8305b0fea,
    0x011111110e066fd0,
    0x0555555555070f00,
    0x155555555581ff00,
    0x400000000002b400,
    0x7fffffffffff4800,
    0x8000000000000000,
];

/// Samples an integer from {0, ..., 18} according to the half-Gaussian of standard deviation
/// `SIGMA_MAX`, using 9 bytes (72 bits) of randomness read as a little-endian integer.
pub fn base_sampler(bytes: [u8; 9]) -> i64 {
    let mut padded = [0u8; 16];
    padded[..9].copy_from_slice(&bytes);
    let u = u128::from_le_bytes(padded);
    RCDT.iter().filter(|&&threshold| u < threshold).count() as i64
}

/// Computes an integer approximation of 2^63 * ccs * exp(-x).
///
/// `x` should lie in [0, ln 2] for full precision; `ccs` must be positive and finite.
pub fn approx_exp(x: f64, ccs: f64) -> Result<u64, TrapdoorError> {
    if !x.is_finite() || !ccs.is_finite() || ccs <= 0.0 {
        return Err(TrapdoorError::InvalidExpInput { x, ccs });
    }
    const TWO_POW_63: f64 = (1u64 << 63) as f64;

    let z = f64::floor(x * TWO_POW_63) as u64;
    let mut y = C[0];
    for &c in C.iter().skip(1) {
        let zy = (z as u128) * (y as u128);
        y = c.wrapping_sub((zy >> 63) as u64);
    }

    let z = f64::floor(TWO_POW_63 * ccs) as u64;
    Ok((((z as u128) * (y as u128)) >> 63) as u64)
}

/// Returns true with probability close to `ccs * exp(-x)`, for `x >= 0`.
///
/// Writes x = s * ln 2 + r, evaluates 2^64 * ccs * exp(-r) / 2^s in fixed point, and compares it
/// byte by byte (most significant first) against fresh random bytes.
pub fn ber_exp<R: Rng>(x: f64, ccs: f64, rng: &mut R) -> Result<bool, TrapdoorError> {
    const LN2: f64 = core::f64::consts::LN_2;
    const ILN2: f64 = 1.0 / LN2;

    let s = f64::floor(x * ILN2);
    let r = x - s * LN2;
    let s = (s as u64).min(63);
    // 2 * approx_exp - 1 can exceed 64 bits when ccs is close to 1
    let doubled = ((approx_exp(r, ccs)? as u128) << 1).saturating_sub(1) >> s;
    let z = doubled.min(u64::MAX as u128) as u64;

    let mut w = 0i32;
    for shift in (0..=56).rev().step_by(8) {
        let mut byte = [0u8; 1];
        rng.fill_bytes(&mut byte);
        w = byte[0] as i32 - ((z >> shift) & 0xff) as i32;
        if w != 0 {
            break;
        }
    }
    Ok(w < 0)
}

/// Samples an integer from the discrete Gaussian with mean `mu` and standard deviation `sigma`.
///
/// Requires `sigma_min <= sigma <= SIGMA_MAX`. Rejection keeps looping until a candidate is
/// accepted; the expected number of iterations is a small constant.
pub fn sampler_z<R: Rng>(
    mu: f64,
    sigma: f64,
    sigma_min: f64,
    rng: &mut R,
) -> Result<i64, TrapdoorError> {
    let isigma = 1.0 / sigma;
    let dss = 0.5 * isigma * isigma;
    let s = f64::floor(mu);
    let r = mu - s;
    let ccs = sigma_min * isigma;

    loop {
        let mut base_bytes = [0u8; 9];
        rng.fill_bytes(&mut base_bytes);
        let z0 = base_sampler(base_bytes);

        let mut sign_byte = [0u8; 1];
        rng.fill_bytes(&mut sign_byte);
        let b = (sign_byte[0] & 1) as i64;
        let z = b + (2 * b - 1) * z0;

        // x = (z - r)^2 / (2 sigma^2) - z0^2 / (2 sigma_max^2)
        let z_minus_r = z as f64 - r;
        let x = z_minus_r * z_minus_r * dss - (z0 * z0) as f64 * INV_2SIGMA_MAX_SQ;

        if ber_exp(x, ccs, rng)? {
            return Ok(z + s as i64);
        }
    }
}

// TESTS
// ================================================================================================
