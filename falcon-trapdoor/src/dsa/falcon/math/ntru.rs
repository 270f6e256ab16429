//! Solver for the NTRU equation f * G - g * F = q over Z[x]/(x^n + 1).
//!
//! The solver projects (f, g) down the tower of rings with the field norm until n = 1, solves a
//! Bézout identity there, and lifts the solution back up. Each lift doubles the size of the
//! coefficients, so every level finishes with a Babai reduction of (F, G) against (f, g).

#[cfg(not(feature = "std"))]
use num::Float;
use num::{BigInt, FromPrimitive, Integer, One, ToPrimitive, Zero};
use num_complex::Complex64;
use tracing::trace;

use super::{FastFft, Polynomial, TrapdoorError, poly_bitsize};
use crate::dsa::falcon::MODULUS;

// CONSTANTS
// ================================================================================================

/// Deepest recursion the solver accepts; the ring degrees in use need at most 11 levels.
pub const MAX_SOLVE_DEPTH: usize = 40;

/// Round budget for a single [reduce_fg] call.
pub const MAX_REDUCTION_ROUNDS: usize = 1000;

/// Bits of precision kept when big integers are approximated by `f64`.
const FLOAT_PRECISION: u64 = 53;

/// The reduction stops when any |f f* + g g*|^2 in the FFT domain falls below this.
const DEGENERATE_DENOMINATOR: f64 = 1e-12;

// NTRU SOLVE
// ================================================================================================

/// Finds (F, G) with f * G - g * F = q modulo x^n + 1, with F and G reduced against (f, g).
///
/// Fails with [TrapdoorError::GcdNotOne] when the integer norms of f and g are not coprime, in
/// which case no solution exists and the caller should draw new polynomials.
pub fn ntru_solve(
    f: &Polynomial<BigInt>,
    g: &Polynomial<BigInt>,
) -> Result<(Polynomial<BigInt>, Polynomial<BigInt>), TrapdoorError> {
    solve_at_depth(f, g, 0)
}

fn solve_at_depth(
    f: &Polynomial<BigInt>,
    g: &Polynomial<BigInt>,
    depth: usize,
) -> Result<(Polynomial<BigInt>, Polynomial<BigInt>), TrapdoorError> {
    if depth > MAX_SOLVE_DEPTH {
        return Err(TrapdoorError::MaxDepthExceeded(MAX_SOLVE_DEPTH));
    }
    let n = f.common_degree(g)?;

    if n == 1 {
        let bezout = f.coefficients[0].extended_gcd(&g.coefficients[0]);
        if !bezout.gcd.is_one() {
            return Err(TrapdoorError::GcdNotOne);
        }
        // f0 * u + g0 * v = 1  =>  f0 * (q * u) - g0 * (-q * v) = q
        let q = BigInt::from(MODULUS);
        let big_f = Polynomial::new(vec![-(&q * &bezout.y)]);
        let big_g = Polynomial::new(vec![q * bezout.x]);
        return Ok((big_f, big_g));
    }

    let f_norm = f.field_norm()?;
    let g_norm = g.field_norm()?;
    let (f_prime, g_prime) = solve_at_depth(&f_norm, &g_norm, depth + 1)?;

    let big_f = f_prime.lift().karamul(&g.galois_conjugate())?;
    let big_g = g_prime.lift().karamul(&f.galois_conjugate())?;
    trace!(depth, n, "lifted NTRU solution");

    reduce_fg(f, g, big_f, big_g)
}

// BABAI REDUCTION
// ================================================================================================

/// Shrinks (F, G) by subtracting integer multiples k * (f, g), which leaves f * G - g * F
/// unchanged.
///
/// k approximates (F f* + G g*) / (f f* + g g*) in floating point, with every operand scaled
/// down to at most 53 significant bits. Rounds repeat until (F, G) is no larger than (f, g) or
/// k rounds to zero. If f f* + g g* is numerically zero at some root, no quotient exists and
/// (F, G) is returned unreduced. Fails with [TrapdoorError::ReductionDivergence] if the rounds
/// do not settle within [MAX_REDUCTION_ROUNDS].
pub fn reduce_fg(
    f: &Polynomial<BigInt>,
    g: &Polynomial<BigInt>,
    mut big_f: Polynomial<BigInt>,
    mut big_g: Polynomial<BigInt>,
) -> Result<(Polynomial<BigInt>, Polynomial<BigInt>), TrapdoorError> {
    let n = f.common_degree(g)?;
    big_f.common_degree(f)?;
    big_g.common_degree(f)?;

    let size = FLOAT_PRECISION.max(poly_bitsize(f)).max(poly_bitsize(g));
    let f_fft = scaled_fft(f, size)?;
    let g_fft = scaled_fft(g, size)?;
    let f_adj = f_fft.adjoint_fft();
    let g_adj = g_fft.adjoint_fft();
    let denominator = f_fft.hadamard_mul(&f_adj) + g_fft.hadamard_mul(&g_adj);
    if denominator.coefficients.iter().any(|d| d.norm_sqr() < DEGENERATE_DENOMINATOR) {
        trace!(n, "degenerate reduction denominator, leaving (F, G) unreduced");
        return Ok((big_f, big_g));
    }

    for round in 0..MAX_REDUCTION_ROUNDS {
        let big_size = FLOAT_PRECISION.max(poly_bitsize(&big_f)).max(poly_bitsize(&big_g));
        if big_size < size {
            return Ok((big_f, big_g));
        }

        let numerator = scaled_fft(&big_f, big_size)?.hadamard_mul(&f_adj)
            + scaled_fft(&big_g, big_size)?.hadamard_mul(&g_adj);
        let k = numerator
            .hadamard_div(&denominator)
            .ifft()?
            .map(|c| BigInt::from_f64(c.re.round()).unwrap_or_default());
        if k.coefficients.iter().all(Zero::is_zero) {
            return Ok((big_f, big_g));
        }

        let shift = big_size - size;
        let fk = f.karamul(&k)?;
        let gk = g.karamul(&k)?;
        for i in 0..n {
            big_f.coefficients[i] -= &fk.coefficients[i] << shift;
            big_g.coefficients[i] -= &gk.coefficients[i] << shift;
        }
        trace!(round, big_size, size, "babai reduction round");
    }

    Err(TrapdoorError::ReductionDivergence(MAX_REDUCTION_ROUNDS))
}

/// FFT of `p` after dropping all but the top 53 of `size` bits.
fn scaled_fft(p: &Polynomial<BigInt>, size: u64) -> Result<Polynomial<Complex64>, TrapdoorError> {
    let shift = size - FLOAT_PRECISION;
    p.map(|c| Complex64::new((c >> shift).to_f64().unwrap_or(0.0), 0.0)).fft()
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use assert_matches::assert_matches;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;
    use rstest::rstest;

    use super::*;
    use crate::dsa::falcon::math::{gen_poly, gs_norm};

    fn poly(coefficients: &[i64]) -> Polynomial<BigInt> {
        Polynomial::new(coefficients.iter().map(|&c| BigInt::from(c)).collect())
    }

    fn ntru_residue(
        f: &Polynomial<BigInt>,
        g: &Polynomial<BigInt>,
        big_f: &Polynomial<BigInt>,
        big_g: &Polynomial<BigInt>,
    ) -> Polynomial<BigInt> {
        f.karamul(big_g).unwrap() - g.karamul(big_f).unwrap()
    }

    fn q_constant(n: usize) -> Polynomial<BigInt> {
        let mut q = Polynomial::zeros(n);
        q.coefficients[0] = BigInt::from(MODULUS);
        q
    }

    #[test]
    fn degree_one_solution_satisfies_bezout() {
        let (f, g) = (poly(&[3]), poly(&[2]));
        let (big_f, big_g) = ntru_solve(&f, &g).unwrap();
        // 3 * G - 2 * F = q
        let lhs = BigInt::from(3) * &big_g.coefficients[0]
            - BigInt::from(2) * &big_f.coefficients[0];
        assert_eq!(lhs, BigInt::from(MODULUS));
    }

    #[test]
    fn non_coprime_norms_are_rejected() {
        assert_matches!(ntru_solve(&poly(&[4]), &poly(&[6])), Err(TrapdoorError::GcdNotOne));
        // N(1 + x) = 2 and N(1 - x) = 2
        let (f, g) = (poly(&[1, 1]), poly(&[1, -1]));
        assert_matches!(ntru_solve(&f, &g), Err(TrapdoorError::GcdNotOne));
    }

    #[test]
    fn recursion_depth_is_capped() {
        let (f, g) = (poly(&[3, 1, 0, 1]), poly(&[2, 0, 1, 1]));
        assert_matches!(
            solve_at_depth(&f, &g, MAX_SOLVE_DEPTH),
            Err(TrapdoorError::MaxDepthExceeded(MAX_SOLVE_DEPTH))
        );
    }

    #[test]
    fn mismatched_degrees_are_rejected() {
        assert_matches!(
            ntru_solve(&poly(&[1, 2]), &poly(&[1, 2, 3, 4])),
            Err(TrapdoorError::InvalidDegree(4))
        );
    }

    #[test]
    fn random_instances_solve_exactly() {
        let mut rng = ChaCha20Rng::from_seed([21; 32]);
        for n in [2usize, 4, 8, 16, 32] {
            let mut solved = 0;
            for _ in 0..50 {
                let f = poly(&(0..n).map(|_| rng.random_range(-20..=20)).collect::<Vec<_>>());
                let g = poly(&(0..n).map(|_| rng.random_range(-20..=20)).collect::<Vec<_>>());
                match ntru_solve(&f, &g) {
                    Ok((big_f, big_g)) => {
                        assert_eq!(ntru_residue(&f, &g, &big_f, &big_g), q_constant(n));
                        solved += 1;
                    },
                    Err(err) => assert!(err.is_resampling_condition(), "unexpected {err}"),
                }
            }
            assert!(solved > 0, "no solvable instance for n = {n}");
        }
    }

    #[test]
    fn reduction_shrinks_and_preserves_the_equation() {
        let f = poly(&[3, 1, 0, 1]);
        let g = poly(&[2, 0, 1, 1]);
        let Ok((big_f, big_g)) = ntru_solve(&f, &g) else {
            // both inputs were picked to have coprime norms
            panic!("fixture should be solvable");
        };

        // push (F, G) far away along (f, g)
        let k = poly(&[1 << 40, -(1 << 35), 12345, 1 << 20]);
        let far_f = big_f.clone() + f.karamul(&k).unwrap();
        let far_g = big_g.clone() + g.karamul(&k).unwrap();
        assert!(poly_bitsize(&far_f) > 40);

        let (red_f, red_g) = reduce_fg(&f, &g, far_f, far_g).unwrap();
        assert_eq!(ntru_residue(&f, &g, &red_f, &red_g), q_constant(4));
        assert!(poly_bitsize(&red_f) <= poly_bitsize(&big_f).max(FLOAT_PRECISION));
        assert!(poly_bitsize(&red_g) <= poly_bitsize(&big_g).max(FLOAT_PRECISION));
    }

    /// Draws Falcon-shaped (f, g) of degree n until the solver succeeds.
    fn solved_instance(n: usize, rng: &mut ChaCha20Rng) -> [Polynomial<BigInt>; 4] {
        let bound = 1.17 * 1.17 * MODULUS as f64;
        for _ in 0..100 {
            let f = gen_poly(n, rng).unwrap();
            let g = gen_poly(n, rng).unwrap();
            if gs_norm(&f, &g, MODULUS as i64).unwrap() > bound {
                continue;
            }
            let (f, g) = (f.to_bigint(), g.to_bigint());
            match ntru_solve(&f, &g) {
                Ok((big_f, big_g)) => return [f, g, big_f, big_g],
                Err(err) => assert!(err.is_resampling_condition(), "unexpected {err}"),
            }
        }
        panic!("no solvable instance of degree {n}");
    }

    #[rstest]
    #[case(64, 16)]
    #[case(512, 8)]
    fn solutions_at_full_degree_are_short(#[case] n: usize, #[case] max_bits: u64) {
        let mut rng = ChaCha20Rng::from_seed([n as u8; 32]);
        let [f, g, big_f, big_g] = solved_instance(n, &mut rng);

        assert_eq!(ntru_residue(&f, &g, &big_f, &big_g), q_constant(n));
        assert!(poly_bitsize(&big_f) <= max_bits, "F has {} bits", poly_bitsize(&big_f));
        assert!(poly_bitsize(&big_g) <= max_bits, "G has {} bits", poly_bitsize(&big_g));
    }

    #[test]
    fn degenerate_denominator_leaves_the_pair_unreduced() {
        let zero = Polynomial::<BigInt>::zeros(4);
        let big_f = poly(&[1 << 60, -(1 << 61), 3, 4]);
        let big_g = poly(&[5, 1 << 62, -7, 1 << 59]);

        let (red_f, red_g) = reduce_fg(&zero, &zero, big_f.clone(), big_g.clone()).unwrap();
        assert_eq!(red_f, big_f);
        assert_eq!(red_g, big_g);
    }
}
