use alloc::{string::ToString, vec::Vec};

use super::{
    FalconLevel, Nonce, SIG_NONCE_LEN,
    codec::{comp_decode, comp_encode},
    hash_to_point::hash_to_point,
    keys::PublicKey,
    math::{FalconFelt, FastFft, Polynomial},
};
use crate::utils::{ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable};

/// Header nibble of a compressed signature.
const SIG_HEADER: u8 = 0x30;

// FALCON SIGNATURE
// ================================================================================================

/// A Falcon signature over a message.
///
/// The signature is a nonce `r` and a polynomial s2 in Z_q\[x\]/(x^n + 1). It verifies against a
/// public key h if and only if, for s1 = c - s2 * h mod q:
///
/// |s1|^2 + |s2|^2 <= β²
///
/// where c = HashToPoint(r || message) and the norms are taken over balanced representatives.
///
/// ## Serialization Format
///
/// 1. Header byte: `0x30 | log n`, i.e. compressed encoding at the given degree.
/// 2. Nonce (40 bytes).
/// 3. s2 in the Falcon compressed encoding, zero-padded to the fixed signature length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    level: FalconLevel,
    nonce: Nonce,
    s2: Polynomial<i16>,
    compressed: Vec<u8>,
}

impl Signature {
    // CONSTRUCTOR
    // --------------------------------------------------------------------------------------------

    /// Creates a signature from its nonce and s2 polynomial.
    ///
    /// Returns `None` if s2 does not have the ring degree of `level` or does not fit the
    /// compressed encoding.
    pub fn new(level: FalconLevel, nonce: Nonce, s2: Polynomial<i16>) -> Option<Self> {
        if s2.len() != level.degree() {
            return None;
        }
        let compressed = comp_encode(&s2.coefficients, compressed_len(level))?;
        Some(Self { level, nonce, s2, compressed })
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn level(&self) -> FalconLevel {
        self.level
    }

    /// Returns the nonce component of the signature.
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Returns the s2 polynomial with its coefficients in balanced form.
    pub fn sig_poly(&self) -> &Polynomial<i16> {
        &self.s2
    }

    // SIGNATURE VERIFICATION
    // --------------------------------------------------------------------------------------------

    /// Returns true if this signature is a valid signature for the specified message generated
    /// against the secret key matching the specified public key.
    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> bool {
        if public_key.level() != self.level {
            return false;
        }
        let params = self.level.params();
        let c = hash_to_point(&self.nonce, message, params.n);

        let s2 = self.s2.map(|&x| FalconFelt::from(x));
        let Ok(s2_ntt) = s2.fft() else {
            return false;
        };
        let Ok(h_ntt) = public_key.h().fft() else {
            return false;
        };
        let Ok(s2h) = s2_ntt.hadamard_mul(&h_ntt).ifft() else {
            return false;
        };
        let s1 = c - s2h;

        let s2_norm: i64 = self.s2.fold(0, |acc, &x| acc + x as i64 * x as i64);
        s1.norm_squared() + s2_norm <= params.sig_bound
    }
}

// SERIALIZATION / DESERIALIZATION
// ================================================================================================

impl Serializable for Signature {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        target.write_u8(SIG_HEADER | self.level.log_n());
        self.nonce.write_into(target);
        target.write_bytes(&self.compressed);
    }

    fn get_size_hint(&self) -> usize {
        self.level.params().sig_len
    }
}

impl Deserializable for Signature {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let header = source.read_u8()?;
        if header & 0xf0 != SIG_HEADER {
            return Err(DeserializationError::InvalidValue(
                "Failed to decode signature: not supported encoding algorithm".to_string(),
            ));
        }
        let level = FalconLevel::from_log_n(header & 0x0f)
            .map_err(|err| DeserializationError::InvalidValue(err.to_string()))?;

        let nonce = source.read()?;
        let compressed = source.read_vec(compressed_len(level))?;
        let coefficients = comp_decode(&compressed, level.degree()).ok_or_else(|| {
            DeserializationError::InvalidValue(
                "Failed to decode signature polynomial".to_string(),
            )
        })?;

        Ok(Self {
            level,
            nonce,
            s2: Polynomial::new(coefficients),
            compressed,
        })
    }
}

/// Length of the compressed s2 field, i.e. the signature length minus header and nonce.
fn compressed_len(level: FalconLevel) -> usize {
    level.params().sig_len - 1 - SIG_NONCE_LEN
}

// TESTS
// ================================================================================================
