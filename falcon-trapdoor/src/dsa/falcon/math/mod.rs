//! The NTRU trapdoor behind Falcon: exact ring arithmetic, the negacyclic FFT/NTT, the NTRU
//! equation solver, key candidate generation, the LDL sampling tree and the Gaussian samplers.
//!
//! The algorithms follow the Falcon specification [1] and its Python reference implementation.
//!
//! [1]: https://falcon-sign.info/falcon.pdf
use alloc::vec::Vec;
use core::ops::MulAssign;

use num::{One, Zero};
use num_complex::Complex64;

mod error;
pub use error::TrapdoorError;

mod field;
pub use field::FalconFelt;

mod polynomial;
pub use polynomial::{Polynomial, RingElement, bitsize, karatsuba, poly_bitsize};

mod fft;
pub use fft::{CyclotomicFourier, FastFft};

mod ntru;
pub use ntru::{MAX_REDUCTION_ROUNDS, MAX_SOLVE_DEPTH, ntru_solve, reduce_fg};

mod keygen;
pub use keygen::{
    DEFAULT_MAX_ATTEMPTS, KeygenConfig, NtruBasis, gen_poly, gs_norm, ntru_gen,
    ntru_gen_with_config,
};

mod ffsampling;
pub use ffsampling::{
    FftMatrix, LdlTree, falcon_normalize_tree, ffldl, ffsampling, gram, ldl, normalize_tree,
};

mod samplerz;
pub use samplerz::{SIGMA_MAX, approx_exp, base_sampler, ber_exp, sampler_z};

// INVERSE
// ================================================================================================

/// Field elements with a (total) inverse, where zero maps to zero.
pub trait Inverse: Copy + Zero + MulAssign + One {
    /// Gets the inverse of a, or zero if it is zero.
    fn inverse_or_zero(self) -> Self;

    /// Inverts a batch with Montgomery's trick, leaving zeros in place.
    fn batch_inverse_or_zero(batch: &[Self]) -> Vec<Self> {
        let mut prefix = Vec::with_capacity(batch.len());
        let mut acc = Self::one();
        for &item in batch {
            prefix.push(acc);
            if !item.is_zero() {
                acc *= item;
            }
        }

        let mut inv = acc.inverse_or_zero();
        let mut result = vec![Self::zero(); batch.len()];
        for (i, &item) in batch.iter().enumerate().rev() {
            if !item.is_zero() {
                result[i] = prefix[i] * inv;
                inv *= item;
            }
        }
        result
    }
}

impl Inverse for Complex64 {
    fn inverse_or_zero(self) -> Self {
        if self.is_zero() { self } else { self.inv() }
    }

    /// Inverts every element on its own: a running product of n floating-point values leaves
    /// the range of `f64` long before n reaches the ring degrees in use.
    fn batch_inverse_or_zero(batch: &[Self]) -> Vec<Self> {
        batch.iter().map(|&c| c.inverse_or_zero()).collect()
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(16)]
    #[case(64)]
    #[case(1024)]
    fn complex_batch_inverse_matches_single_inverses(#[case] n: usize) {
        let batch: Vec<Complex64> = (0..n)
            .map(|i| {
                if i % 7 == 3 {
                    Complex64::zero()
                } else {
                    Complex64::new(8e6 + i as f64, -3e5 * i as f64)
                }
            })
            .collect();
        let inverses = Complex64::batch_inverse_or_zero(&batch);

        assert_eq!(inverses.len(), n);
        for (c, inv) in batch.iter().zip(inverses.iter()) {
            if c.is_zero() {
                assert!(inv.is_zero());
            } else {
                assert!((inv - c.inv()).norm() <= 1e-12 * c.inv().norm());
            }
        }
    }
}
