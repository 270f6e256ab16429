//! Falcon signatures over the NTRU lattice trapdoor, at the 512 and 1024 security levels.
//!
//! Key generation, the LDL sampling tree and the fast-Fourier sampler are implemented in
//! [math]. This module adds the scheme around them: SHAKE256 hash-to-point, the standard Falcon
//! key and signature encodings, and deterministic signing.
//!
//! ## Deterministic Signing
//!
//! [SecretKey::sign] derives the sampler seed from the secret key and the message using BLAKE3,
//! so the same (secret key, message) pair always produces the same signature.
//! [SecretKey::sign_with_rng] draws all randomness from the caller's RNG instead.

use rand::Rng;

use crate::utils::{ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable};

mod codec;
mod hash_to_point;
mod keys;
pub mod math;
mod params;
mod signature;

#[cfg(test)]
mod tests;

pub use self::{
    hash_to_point::hash_to_point,
    keys::{PublicKey, SecretKey},
    params::{FalconLevel, ParameterError, Parameters},
    signature::Signature,
};

// CONSTANTS
// ================================================================================================

/// The Falcon modulus q.
pub const MODULUS: i16 = 12289;

/// Number of bits needed to encode an element of Z/qZ.
const FALCON_ENCODING_BITS: u32 = 14;

/// Length of the nonce prepended to the message before hashing it to a point.
pub const SIG_NONCE_LEN: usize = 40;

/// Largest absolute value of a signature coefficient the compressed encoding accepts.
const MAX_SIG_COEFFICIENT: i16 = 2047;

// NONCE
// ================================================================================================

/// The random salt of a Falcon signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce([u8; SIG_NONCE_LEN]);

impl Nonce {
    /// Draws a fresh nonce from the provided RNG.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut nonce_bytes = [0u8; SIG_NONCE_LEN];
        rng.fill_bytes(&mut nonce_bytes);
        Self(nonce_bytes)
    }

    /// Returns a nonce with the given bytes.
    pub const fn from_bytes(nonce_bytes: [u8; SIG_NONCE_LEN]) -> Self {
        Self(nonce_bytes)
    }

    /// Returns the underlying bytes of this nonce.
    pub const fn as_bytes(&self) -> &[u8; SIG_NONCE_LEN] {
        &self.0
    }
}

impl Serializable for Nonce {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        target.write_bytes(&self.0);
    }
}

impl Deserializable for Nonce {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok(Self(source.read_array()?))
    }
}
