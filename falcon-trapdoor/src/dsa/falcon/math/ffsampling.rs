use alloc::{boxed::Box, vec::Vec};

use falcon_trapdoor_derive::SilentDebug;
#[cfg(not(feature = "std"))]
use num::Float;
use num_complex::Complex64;
use rand::Rng;

use super::{FastFft, Polynomial, TrapdoorError, sampler_z};
use crate::utils::zeroize::{Zeroize, ZeroizeOnDrop};

/// A 2x2 matrix of FFT-domain polynomials, stored row-major.
pub type FftMatrix = [Polynomial<Complex64>; 4];

// GRAM AND LDL
// ================================================================================================

/// Computes the Gram matrix B * B^* of a 2x2 basis given in FFT form.
pub fn gram(b: &FftMatrix) -> FftMatrix {
    const N: usize = 2;
    let n = b[0].len();
    let mut g: FftMatrix = core::array::from_fn(|_| Polynomial::zeros(n));
    for i in 0..N {
        for j in 0..N {
            for k in 0..N {
                g[N * i + j] += &b[N * i + k].hadamard_mul(&b[N * j + k].adjoint_fft());
            }
        }
    }
    g
}

/// Computes the LDL* decomposition of a self-adjoint 2x2 matrix G in FFT form.
///
/// Returns the non-trivial entries `(l10, d00, d11)` with
/// `d00 = g00`, `l10 = g10 / g00` and `d11 = g11 - l10 * l10^* * g00`.
pub fn ldl(
    g: &FftMatrix,
) -> (Polynomial<Complex64>, Polynomial<Complex64>, Polynomial<Complex64>) {
    let l10 = g[2].hadamard_div(&g[0]);
    let l10_sq = l10.map(|c| c * c.conj());
    let d11 = g[3].clone() - g[0].hadamard_mul(&l10_sq);
    (l10, g[0].clone(), d11)
}

// LDL TREE
// ================================================================================================

/// The recursive LDL decomposition of a Gram matrix, a.k.a. the Falcon tree.
///
/// Every node splits its two diagonal blocks into half-length Gram matrices, down to FFT length
/// 1 where the diagonal entries are plain real variances. A tree built from a root of FFT length
/// n therefore has n leaves.
#[derive(Clone, SilentDebug)]
pub enum LdlTree {
    Node {
        l10: Polynomial<Complex64>,
        left: Box<LdlTree>,
        right: Box<LdlTree>,
    },
    Leaf {
        d00: f64,
        d11: f64,
    },
}

impl LdlTree {
    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        match self {
            LdlTree::Node { left, right, .. } => left.leaf_count() + right.leaf_count(),
            LdlTree::Leaf { .. } => 1,
        }
    }

    /// The `(d00, d11)` pairs of all leaves, left to right.
    pub fn leaves(&self) -> Vec<(f64, f64)> {
        let mut leaves = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(&self, out: &mut Vec<(f64, f64)>) {
        match self {
            LdlTree::Node { left, right, .. } => {
                left.collect_leaves(out);
                right.collect_leaves(out);
            },
            LdlTree::Leaf { d00, d11 } => out.push((*d00, *d11)),
        }
    }

    /// Applies `op` to every leaf variance.
    fn try_map_leaves(
        &mut self,
        op: &mut impl FnMut(f64) -> Result<f64, TrapdoorError>,
    ) -> Result<(), TrapdoorError> {
        match self {
            LdlTree::Node { left, right, .. } => {
                left.try_map_leaves(op)?;
                right.try_map_leaves(op)
            },
            LdlTree::Leaf { d00, d11 } => {
                *d00 = op(*d00)?;
                *d11 = op(*d11)?;
                Ok(())
            },
        }
    }
}

impl Zeroize for LdlTree {
    fn zeroize(&mut self) {
        match self {
            LdlTree::Node { l10, left, right } => {
                for coeff in l10.coefficients.iter_mut() {
                    // SAFETY: `coeff` is a valid, aligned, exclusive reference
                    unsafe {
                        core::ptr::write_volatile(coeff, Complex64::new(0.0, 0.0));
                    }
                }
                left.zeroize();
                right.zeroize();
            },
            LdlTree::Leaf { d00, d11 } => {
                // SAFETY: both are valid, aligned, exclusive references
                unsafe {
                    core::ptr::write_volatile(d00, 0.0);
                    core::ptr::write_volatile(d11, 0.0);
                }
            },
        }
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
    }
}

// Complex64 does not implement Zeroize, so ZeroizeOnDrop cannot be derived.
impl Drop for LdlTree {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for LdlTree {}

/// Builds the LDL tree of a Gram matrix in FFT form. Algorithm 9 of the Falcon specification.
///
/// The root must have FFT length at least 2. Fails with [TrapdoorError::NonPositiveVariance]
/// if a leaf variance is not a positive finite real, which happens for degenerate or poorly
/// reduced bases.
pub fn ffldl(gram_matrix: &FftMatrix) -> Result<LdlTree, TrapdoorError> {
    let n = gram_matrix[0].ring_degree()?;
    if n < 2 {
        return Err(TrapdoorError::InvalidDegree(n));
    }
    if gram_matrix.iter().any(|p| p.len() != n) {
        return Err(TrapdoorError::StructuralMismatch(n));
    }
    build_tree(gram_matrix)
}

fn build_tree(g: &FftMatrix) -> Result<LdlTree, TrapdoorError> {
    let (l10, d00, d11) = ldl(g);

    if d00.len() == 1 {
        return Ok(LdlTree::Leaf {
            d00: checked_variance(d00.coefficients[0].re)?,
            d11: checked_variance(d11.coefficients[0].re)?,
        });
    }

    Ok(LdlTree::Node {
        l10,
        left: Box::new(build_tree(&split_gram(&d00))?),
        right: Box::new(build_tree(&split_gram(&d11))?),
    })
}

/// The Gram matrix [[d0, d1], [d1^*, d0]] of the halves of a self-adjoint polynomial.
fn split_gram(d: &Polynomial<Complex64>) -> FftMatrix {
    let (d0, d1) = d.split_fft();
    let d1_adj = d1.adjoint_fft();
    [d0.clone(), d1, d1_adj, d0]
}

fn checked_variance(d: f64) -> Result<f64, TrapdoorError> {
    if d.is_finite() && d > 0.0 {
        Ok(d)
    } else {
        Err(TrapdoorError::NonPositiveVariance(d))
    }
}

// NORMALIZATION
// ================================================================================================

/// Rescales all leaf variances by one common factor so that their mean magnitude becomes
/// `sigma^2`.
///
/// The mean is taken over |d| for the leaf values that are finite and non-zero. If there are
/// none, the tree is left as it is. Every scaled value must be a positive finite real.
pub fn normalize_tree(tree: &mut LdlTree, sigma: f64) -> Result<(), TrapdoorError> {
    check_sigma(sigma)?;
    let (sum, count) = tree
        .leaves()
        .iter()
        .flat_map(|&(d00, d11)| [d00.abs(), d11.abs()])
        .filter(|d| d.is_finite() && *d > 0.0)
        .fold((0.0, 0usize), |(sum, count), d| (sum + d, count + 1));
    if count == 0 {
        return Ok(());
    }
    let mean = sum / count as f64;
    if !(mean.is_finite() && mean > 0.0) {
        return Ok(());
    }

    let factor = sigma * sigma / mean;
    tree.try_map_leaves(&mut |d| {
        let scaled = d * factor;
        if scaled.is_finite() && scaled > 0.0 {
            Ok(scaled)
        } else {
            Err(TrapdoorError::InvalidLeafAfterScale(scaled))
        }
    })
}

/// Replaces every leaf variance d with sigma^2 / d, so that sampling at a leaf uses the
/// standard deviation sigma / sqrt(d).
pub fn falcon_normalize_tree(tree: &mut LdlTree, sigma: f64) -> Result<(), TrapdoorError> {
    check_sigma(sigma)?;
    let sigma_sq = sigma * sigma;
    tree.try_map_leaves(&mut |d| {
        let scaled = sigma_sq / checked_variance(d)?;
        if scaled.is_finite() && scaled > 0.0 {
            Ok(scaled)
        } else {
            Err(TrapdoorError::InvalidLeafAfterScale(scaled))
        }
    })
}

fn check_sigma(sigma: f64) -> Result<(), TrapdoorError> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(TrapdoorError::BadSigma(sigma))
    }
}

// FAST FOURIER SAMPLING
// ================================================================================================

/// Samples short polynomials near the target `t = (t0, t1)` using an LDL tree. Algorithm 11 of
/// the Falcon specification.
///
/// Both target halves are in FFT form and the tree must have been built for their length;
/// otherwise [TrapdoorError::StructuralMismatch] is returned. Leaves sample with standard
/// deviation `sqrt(d)`, which must lie in `[sigma_min, SIGMA_MAX]`.
pub fn ffsampling<R: Rng>(
    t: &(Polynomial<Complex64>, Polynomial<Complex64>),
    tree: &LdlTree,
    sigma_min: f64,
    rng: &mut R,
) -> Result<(Polynomial<Complex64>, Polynomial<Complex64>), TrapdoorError> {
    let n = t.0.len();
    if t.1.len() != n {
        return Err(TrapdoorError::StructuralMismatch(n));
    }

    match tree {
        LdlTree::Node { l10, left, right } if n >= 2 && l10.len() == n => {
            let bold_z1 = ffsampling(&t.1.split_fft(), right, sigma_min, rng)?;
            let z1 = Polynomial::merge_fft(&bold_z1.0, &bold_z1.1);

            // t0' = t0 + (t1 - z1) * l10
            let t0_prime = &t.0 + &(&t.1 - &z1).hadamard_mul(l10);

            let bold_z0 = ffsampling(&t0_prime.split_fft(), left, sigma_min, rng)?;
            let z0 = Polynomial::merge_fft(&bold_z0.0, &bold_z0.1);

            Ok((z0, z1))
        },
        LdlTree::Leaf { d00, d11 } if n == 1 => {
            let z0 = sampler_z(t.0.coefficients[0].re, d00.sqrt(), sigma_min, rng)?;
            let z1 = sampler_z(t.1.coefficients[0].re, d11.sqrt(), sigma_min, rng)?;
            Ok((
                Polynomial::new(vec![Complex64::new(z0 as f64, 0.0)]),
                Polynomial::new(vec![Complex64::new(z1 as f64, 0.0)]),
            ))
        },
        _ => Err(TrapdoorError::StructuralMismatch(n)),
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use rstest::rstest;

    use super::*;
    use crate::dsa::falcon::math::ntru_gen;

    fn identity_basis(n: usize) -> FftMatrix {
        let mut one = Polynomial::<i64>::zeros(n);
        one.coefficients[0] = 1;
        let one = one.to_fft().unwrap();
        let zero = Polynomial::zeros(n);
        [one.clone(), zero.clone(), zero, one]
    }

    fn ntru_fft_basis(n: usize, seed: u8) -> FftMatrix {
        let mut rng = ChaCha20Rng::from_seed([seed; 32]);
        ntru_gen(n, &mut rng).unwrap().fft_basis().unwrap()
    }

    fn assert_close(a: &Polynomial<Complex64>, b: &Polynomial<Complex64>) {
        for (x, y) in a.coefficients.iter().zip(b.coefficients.iter()) {
            let scale = 1.0 + x.norm().max(y.norm());
            assert!((x - y).norm() < 1e-7 * scale, "{x} differs from {y}");
        }
    }

    #[test]
    fn gram_of_identity_is_identity() {
        let b = identity_basis(8);
        let g = gram(&b);
        for (gi, bi) in g.iter().zip(b.iter()) {
            assert_close(gi, bi);
        }
    }

    #[rstest]
    #[case(16)]
    #[case(512)]
    fn ldl_reconstructs_the_gram_matrix(#[case] n: usize) {
        let g = gram(&ntru_fft_basis(n, 1));
        let (l10, d00, d11) = ldl(&g);

        // G = L D L^*
        assert_close(&d00, &g[0]);
        assert_close(&l10.hadamard_mul(&d00), &g[2]);
        assert_close(&d00.hadamard_mul(&l10.adjoint_fft()), &g[1]);
        let g11 = &l10.hadamard_mul(&d00).hadamard_mul(&l10.adjoint_fft()) + &d11;
        assert_close(&g11, &g[3]);
    }

    #[rstest]
    #[case(2)]
    #[case(16)]
    #[case(64)]
    fn tree_of_an_ntru_basis_has_positive_leaves(#[case] n: usize) {
        let tree = ffldl(&gram(&ntru_fft_basis(n, 2))).unwrap();
        assert_eq!(tree.leaf_count(), n);
        for (d00, d11) in tree.leaves() {
            assert!(d00 > 0.0 && d11 > 0.0);
        }
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        let one = Polynomial::new(vec![Complex64::new(1.0, 0.0)]);
        let g = [one.clone(), one.clone(), one.clone(), one];
        assert_matches!(ffldl(&g), Err(TrapdoorError::InvalidDegree(1)));

        let zero: FftMatrix = core::array::from_fn(|_| Polynomial::zeros(8));
        assert_matches!(ffldl(&zero), Err(TrapdoorError::NonPositiveVariance(_)));
    }

    #[test]
    fn normalization_sets_the_mean_variance() {
        let mut tree = ffldl(&gram(&ntru_fft_basis(32, 3))).unwrap();
        let before = tree.leaves();
        normalize_tree(&mut tree, 1.5).unwrap();
        let after = tree.leaves();

        let mean = after.iter().map(|(a, b)| a + b).sum::<f64>() / (2 * after.len()) as f64;
        assert!((mean - 2.25).abs() < 1e-9);
        // a single factor preserves ratios
        let ratio = after[0].0 / before[0].0;
        for ((a0, a1), (b0, b1)) in after.iter().zip(before.iter()) {
            assert!((a0 / b0 - ratio).abs() < 1e-9 * ratio);
            assert!((a1 / b1 - ratio).abs() < 1e-9 * ratio);
        }
    }

    #[test]
    fn normalization_errors() {
        let mut tree = ffldl(&gram(&identity_basis(4))).unwrap();
        assert_matches!(normalize_tree(&mut tree, 0.0), Err(TrapdoorError::BadSigma(_)));
        assert_matches!(normalize_tree(&mut tree, f64::NAN), Err(TrapdoorError::BadSigma(_)));
        assert_matches!(
            falcon_normalize_tree(&mut tree, -1.0),
            Err(TrapdoorError::BadSigma(_))
        );

        let mut skewed = LdlTree::Node {
            l10: Polynomial::zeros(2),
            left: Box::new(LdlTree::Leaf { d00: -1.0, d11: 5.0 }),
            right: Box::new(LdlTree::Leaf { d00: 1.0, d11: 3.0 }),
        };
        assert_matches!(
            normalize_tree(&mut skewed, 1.0),
            Err(TrapdoorError::InvalidLeafAfterScale(_))
        );
    }

    #[test]
    fn normalization_averages_magnitudes_of_valid_leaves() {
        let mut tree = LdlTree::Node {
            l10: Polynomial::zeros(2),
            left: Box::new(LdlTree::Leaf { d00: 1.0, d11: 0.0 }),
            right: Box::new(LdlTree::Leaf { d00: 2.0, d11: 3.0 }),
        };
        // the zero leaf is left out of the mean, which is 2, but still has to scale validly
        assert_matches!(
            normalize_tree(&mut tree, 2.0),
            Err(TrapdoorError::InvalidLeafAfterScale(_))
        );

        let mut tree = LdlTree::Node {
            l10: Polynomial::zeros(2),
            left: Box::new(LdlTree::Leaf { d00: 1.0, d11: f64::INFINITY }),
            right: Box::new(LdlTree::Leaf { d00: 2.0, d11: 3.0 }),
        };
        assert_matches!(
            normalize_tree(&mut tree, 2.0),
            Err(TrapdoorError::InvalidLeafAfterScale(_))
        );

        let mut tree = LdlTree::Node {
            l10: Polynomial::zeros(2),
            left: Box::new(LdlTree::Leaf { d00: 1.0, d11: 2.0 }),
            right: Box::new(LdlTree::Leaf { d00: 3.0, d11: 6.0 }),
        };
        normalize_tree(&mut tree, 2.0).unwrap();
        // mean 3 becomes 4
        let expected = [(4.0 / 3.0, 8.0 / 3.0), (4.0, 8.0)];
        for ((d00, d11), (e00, e11)) in tree.leaves().into_iter().zip(expected) {
            assert!((d00 - e00).abs() < 1e-12 && (d11 - e11).abs() < 1e-12);
        }
    }

    #[test]
    fn normalization_of_an_all_zero_tree_is_a_no_op() {
        let mut tree = LdlTree::Node {
            l10: Polynomial::zeros(2),
            left: Box::new(LdlTree::Leaf { d00: 0.0, d11: 0.0 }),
            right: Box::new(LdlTree::Leaf { d00: 0.0, d11: 0.0 }),
        };
        normalize_tree(&mut tree, 1.5).unwrap();
        assert_eq!(tree.leaves(), vec![(0.0, 0.0), (0.0, 0.0)]);
    }

    #[test]
    fn falcon_normalization_inverts_leaves() {
        let mut tree = ffldl(&gram(&identity_basis(4))).unwrap();
        falcon_normalize_tree(&mut tree, 1.5).unwrap();
        for (d00, d11) in tree.leaves() {
            assert!((d00 - 2.25).abs() < 1e-9);
            assert!((d11 - 2.25).abs() < 1e-9);
        }
    }

    #[test]
    fn samples_are_integer_points_near_the_target() {
        let n = 32;
        let mut tree = ffldl(&gram(&identity_basis(n))).unwrap();
        falcon_normalize_tree(&mut tree, 1.5).unwrap();

        let target: Vec<f64> = (0..n).map(|i| i as f64 * 3.7 - 50.0).collect();
        let t_fft = Polynomial::<Complex64>::from_real(&Polynomial::new(target.clone()))
            .fft()
            .unwrap();
        let (t0, t1) = (t_fft.clone(), t_fft);

        let mut rng = ChaCha20Rng::from_seed([9; 32]);
        let (z0, z1) = ffsampling(&(t0, t1), &tree, 1.2778336969128337, &mut rng).unwrap();
        for z in [z0, z1] {
            let coefficients = z.ifft().unwrap();
            for (c, t) in coefficients.coefficients.iter().zip(target.iter()) {
                assert!((c.re - c.re.round()).abs() < 1e-6);
                assert!(c.im.abs() < 1e-6);
                assert!((c.re - t).abs() < 15.0, "{} is far from {t}", c.re);
            }
        }
    }

    #[test]
    fn mismatched_tree_is_rejected() {
        let tree = ffldl(&gram(&identity_basis(4))).unwrap();
        let t = (Polynomial::zeros(8), Polynomial::zeros(8));
        let mut rng = ChaCha20Rng::from_seed([0; 32]);
        assert_matches!(
            ffsampling(&t, &tree, 1.2778336969128337, &mut rng),
            Err(TrapdoorError::StructuralMismatch(8))
        );

        let leaf = LdlTree::Leaf { d00: 2.0, d11: 2.0 };
        let t = (Polynomial::zeros(2), Polynomial::zeros(2));
        assert_matches!(
            ffsampling(&t, &leaf, 1.2778336969128337, &mut rng),
            Err(TrapdoorError::StructuralMismatch(2))
        );
    }

    #[test]
    fn tree_debug_output_is_elided() {
        let tree = ffldl(&gram(&identity_basis(2))).unwrap();
        assert_eq!(format!("{tree:?}"), "<elided secret for LdlTree>");
    }
}
