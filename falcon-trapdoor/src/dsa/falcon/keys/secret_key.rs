use alloc::{string::ToString, vec::Vec};

use falcon_trapdoor_derive::{SilentDebug, SilentDisplay};
#[cfg(not(feature = "std"))]
use num::Float;
use num::Zero;
use num_complex::Complex64;
use rand::{CryptoRng, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use super::{
    super::{
        MODULUS, Nonce, Signature,
        codec::{trim_i8_decode, trim_i8_encode},
        hash_to_point::hash_to_point,
        math::{
            FastFft, KeygenConfig, LdlTree, NtruBasis, Polynomial, TrapdoorError,
            falcon_normalize_tree, ffldl, ffsampling, gram, ntru_gen_with_config,
        },
        params::FalconLevel,
    },
    ByteReader, ByteWriter, Deserializable, DeserializationError, PublicKey, Serializable,
};
use crate::utils::zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Header nibble of an encoded secret key.
const SK_HEADER: u8 = 0x50;

// SECRET KEY
// ================================================================================================

/// Represents the secret key for Falcon DSA.
///
/// The secret key consists of four polynomials [f, g, F, G] that form a short basis for an NTRU
/// lattice with f * G - g * F = q. The public key h = g/f (mod q) is derived from it. Alongside
/// the basis, the key keeps the LDL tree of its Gram matrix, normalized for signing, and its
/// encoded form.
///
/// [1]: https://falcon-sign.info/falcon.pdf
#[derive(Clone, SilentDebug, SilentDisplay)]
pub struct SecretKey {
    level: FalconLevel,
    basis: NtruBasis,
    tree: LdlTree,
    public_key: PublicKey,
    encoded: Vec<u8>,
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.basis.zeroize();
        self.tree.zeroize();
        self.encoded.zeroize();
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl SecretKey {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// Generates a secret key from OS-provided randomness.
    #[cfg(feature = "std")]
    pub fn new(level: FalconLevel) -> Result<Self, TrapdoorError> {
        let mut rng = rand::rng();
        Self::with_rng(level, &mut rng)
    }

    /// Generates a secret key using the provided random number generator.
    ///
    /// # Security Requirements
    ///
    /// The provided RNG must be cryptographically secure. Using a weak or predictable RNG will
    /// completely compromise security.
    pub fn with_rng<R: Rng + CryptoRng>(
        level: FalconLevel,
        rng: &mut R,
    ) -> Result<Self, TrapdoorError> {
        Self::with_config(level, &KeygenConfig::default(), rng)
    }

    /// Generates a secret key, drawing NTRU bases until one fits the secret key encoding.
    ///
    /// The attempt budget of `config` applies both to each basis generation and to the number
    /// of bases drawn here.
    pub fn with_config<R: Rng + CryptoRng>(
        level: FalconLevel,
        config: &KeygenConfig,
        rng: &mut R,
    ) -> Result<Self, TrapdoorError> {
        for attempt in 1..=config.max_attempts {
            let basis = ntru_gen_with_config(level.degree(), config, rng)?;
            match encode_basis(level, &basis) {
                Some(encoded) => return Self::from_parts(level, basis, encoded),
                None => debug!(attempt, %level, "basis does not fit the key encoding, resampling"),
            }
        }
        Err(TrapdoorError::KeyGenExhausted(config.max_attempts))
    }

    /// Builds a secret key from an NTRU basis of the ring degree of `level`.
    ///
    /// Returns `None` if the basis is not a valid NTRU basis or its coefficients do not fit the
    /// secret key encoding.
    pub fn from_basis(level: FalconLevel, basis: NtruBasis) -> Option<Self> {
        if basis.degree() != level.degree() || !basis.satisfies_ntru_equation() {
            return None;
        }
        let encoded = encode_basis(level, &basis)?;
        Self::from_parts(level, basis, encoded).ok()
    }

    fn from_parts(
        level: FalconLevel,
        basis: NtruBasis,
        encoded: Vec<u8>,
    ) -> Result<Self, TrapdoorError> {
        let public_key = PublicKey::new(level, basis.public_key_poly()?)?;
        let mut tree = ffldl(&gram(&basis.fft_basis()?))?;
        falcon_normalize_tree(&mut tree, level.params().sigma)?;
        Ok(Self { level, basis, tree, public_key, encoded })
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn level(&self) -> FalconLevel {
        self.level
    }

    /// Returns the public key corresponding to this secret key.
    pub fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    /// Returns the short lattice basis [f, g, F, G].
    pub fn short_lattice_basis(&self) -> &NtruBasis {
        &self.basis
    }

    // SIGNATURE GENERATION
    // --------------------------------------------------------------------------------------------

    /// Signs a message with this secret key using deterministic signing.
    ///
    /// The signing seed is derived from the message and secret key using BLAKE3, ensuring the
    /// same message always produces the same signature.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, TrapdoorError> {
        let mut seed = self.generate_signing_seed(message);
        let mut rng = ChaCha20Rng::from_seed(seed);
        seed.zeroize();
        self.sign_with_rng(message, &mut rng)
    }

    /// Signs a message with the secret key using the provided randomness generator.
    ///
    /// Each attempt draws a fresh nonce, hashes the message to a point c and samples a short
    /// preimage (s1, s2) of c. Attempts whose norm exceeds the signature bound, or whose s2
    /// does not compress into the fixed signature size, are discarded.
    pub fn sign_with_rng<R: Rng>(
        &self,
        message: &[u8],
        rng: &mut R,
    ) -> Result<Signature, TrapdoorError> {
        let params = self.level.params();
        let b0 = Zeroizing::new(FftBasis(self.basis.fft_basis()?));

        loop {
            let nonce = Nonce::random(rng);
            let c = hash_to_point(&nonce, message, params.n);
            let (s1, s2) = self.sample_preimage(&c.to_balanced(), &b0.0, rng)?;

            let norm = s1.norm_squared() + s2.norm_squared();
            if norm > params.sig_bound {
                debug!(norm, "signature norm above the bound, resampling");
                continue;
            }
            let Some(s2) = s2
                .coefficients
                .iter()
                .map(|&c| i16::try_from(c).ok())
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            if let Some(signature) = Signature::new(self.level, nonce, Polynomial::new(s2)) {
                return Ok(signature);
            }
            debug!("signature does not compress, resampling");
        }
    }

    /// Samples (s1, s2) with s1 + s2 * h = c mod q, as short as the basis allows.
    ///
    /// With B = [[g, -f], [G, -F]], the target t = (c, 0) * B^-1 is (c * -F / q, c * f / q).
    /// ffSampling returns z close to t, and s = (c, 0) - z * B.
    fn sample_preimage<R: Rng>(
        &self,
        c: &Polynomial<i64>,
        b0: &[Polynomial<Complex64>; 4],
        rng: &mut R,
    ) -> Result<(Polynomial<i64>, Polynomial<i64>), TrapdoorError> {
        let [a, b, c_row, d] = b0;
        let q_inv = Complex64::new(1.0 / MODULUS as f64, 0.0);
        let c_fft = c.to_fft()?;

        let t0 = &c_fft.hadamard_mul(d) * q_inv;
        let t1 = &(-&c_fft).hadamard_mul(b) * q_inv;
        let (z0, z1) = ffsampling(&(t0, t1), &self.tree, self.level.params().sigma_min, rng)?;

        let v0 = (z0.hadamard_mul(a) + z1.hadamard_mul(c_row)).ifft()?;
        let v1 = (z0.hadamard_mul(b) + z1.hadamard_mul(d)).ifft()?;

        let s1 = c - &round(&v0);
        let s2 = -round(&v1);
        Ok((s1, s2))
    }

    /// Derives a 32-byte signing seed from the secret key and the message with BLAKE3.
    fn generate_signing_seed(&self, message: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[self.level.log_n()]);
        hasher.update(&self.encoded);
        hasher.update(message);

        let mut seed = [0u8; 32];
        hasher.finalize_xof().fill(&mut seed);
        seed
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.encoded.ct_eq(&other.encoded).into()
    }
}

impl Eq for SecretKey {}

// SERIALIZATION / DESERIALIZATION
// ================================================================================================

impl Serializable for SecretKey {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        target.write_bytes(&self.encoded);
    }

    fn get_size_hint(&self) -> usize {
        self.encoded.len()
    }
}

impl Deserializable for SecretKey {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let header = source.read_u8()?;
        if header & 0xf0 != SK_HEADER {
            return Err(DeserializationError::InvalidValue(format!(
                "Failed to decode secret key: invalid header {header:#04x}"
            )));
        }
        let level = FalconLevel::from_log_n(header & 0x0f)
            .map_err(|err| DeserializationError::InvalidValue(err.to_string()))?;
        let params = level.params();
        let n = params.n;

        let body = Zeroizing::new(source.read_vec(params.sk_len - 1)?);
        let fg_len = n * params.fg_bits as usize / 8;
        let invalid = || {
            DeserializationError::InvalidValue(
                "Failed to decode secret key: invalid encoding".to_string(),
            )
        };
        let f = trim_i8_decode(&body[..fg_len], n, params.fg_bits).ok_or_else(invalid)?;
        let g = trim_i8_decode(&body[fg_len..2 * fg_len], n, params.fg_bits).ok_or_else(invalid)?;
        let big_f =
            trim_i8_decode(&body[2 * fg_len..], n, params.big_f_bits).ok_or_else(invalid)?;

        let (f, g, big_f) = (Polynomial::new(f), Polynomial::new(g), Polynomial::new(big_f));
        let big_g = recover_big_g(&f, &g, &big_f).ok_or_else(invalid)?;
        let basis = NtruBasis { f, g, big_f, big_g };

        let mut encoded = Vec::with_capacity(params.sk_len);
        encoded.push(header);
        encoded.extend_from_slice(&body);

        if !basis.satisfies_ntru_equation() {
            return Err(invalid());
        }
        Self::from_parts(level, basis, encoded)
            .map_err(|err| DeserializationError::InvalidValue(err.to_string()))
    }
}

// HELPER FUNCTIONS
// ================================================================================================

/// Encodes [f, g, F] with the widths of `level`, or returns `None` if a coefficient of f, g, F
/// or G does not fit.
fn encode_basis(level: FalconLevel, basis: &NtruBasis) -> Option<Vec<u8>> {
    let params = level.params();
    let max_big = (1i64 << (params.big_f_bits - 1)) - 1;
    if basis.big_g.coefficients.iter().any(|c| c.abs() > max_big) {
        return None;
    }

    let mut encoded = Vec::with_capacity(params.sk_len);
    encoded.push(SK_HEADER | level.log_n());
    encoded.extend(trim_i8_encode(&basis.f.coefficients, params.fg_bits)?);
    encoded.extend(trim_i8_encode(&basis.g.coefficients, params.fg_bits)?);
    encoded.extend(trim_i8_encode(&basis.big_f.coefficients, params.big_f_bits)?);
    Some(encoded)
}

/// Recomputes G = g * F / f mod q from the NTRU equation, in balanced form.
///
/// Returns `None` if f is not invertible mod q or G falls outside the encodable range.
fn recover_big_g(
    f: &Polynomial<i64>,
    g: &Polynomial<i64>,
    big_f: &Polynomial<i64>,
) -> Option<Polynomial<i64>> {
    let f_ntt = f.to_field().fft().ok()?;
    if f_ntt.coefficients.iter().any(Zero::is_zero) {
        return None;
    }
    let g_ntt = g.to_field().fft().ok()?;
    let big_f_ntt = big_f.to_field().fft().ok()?;
    let big_g = g_ntt.hadamard_mul(&big_f_ntt).hadamard_div(&f_ntt).ifft().ok()?.to_balanced();
    big_g.coefficients.iter().all(|c| c.abs() <= 127).then_some(big_g)
}

/// Rounds the real parts of a coefficient-domain vector to integers.
fn round(p: &Polynomial<Complex64>) -> Polynomial<i64> {
    p.map(|c| c.re.round() as i64)
}

/// The FFT of a secret basis, wiped when dropped.
struct FftBasis([Polynomial<Complex64>; 4]);

impl Zeroize for FftBasis {
    fn zeroize(&mut self) {
        for poly in self.0.iter_mut() {
            for coeff in poly.coefficients.iter_mut() {
                // SAFETY: `coeff` is a valid, aligned, exclusive reference
                unsafe {
                    core::ptr::write_volatile(coeff, Complex64::new(0.0, 0.0));
                }
            }
        }
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
    }
}
