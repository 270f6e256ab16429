use std::{
    string::{String, ToString},
    vec::Vec,
};

use rand::{CryptoRng, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use super::protocol::{Keypair, SecretBytes};
use crate::{
    dsa::falcon::{FalconLevel, PublicKey, SecretKey, Signature, math::TrapdoorError},
    utils::{Deserializable, Serializable},
};

// BACKEND ERROR
// ================================================================================================

/// Failures of a signature backend, reported back to the caller as a message.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Trapdoor(#[from] TrapdoorError),
    #[error("invalid {what} encoding: {reason}")]
    Decoding { what: &'static str, reason: String },
    #[error("{what} is for {found}, but {expected} was requested")]
    LevelMismatch {
        what: &'static str,
        expected: FalconLevel,
        found: FalconLevel,
    },
}

// SIGNATURE BACKEND
// ================================================================================================

/// The operations a worker delegates to, over encoded keys and signatures.
///
/// Only byte buffers cross this interface; bases, sampling trees and sampler state stay inside
/// the implementation.
pub trait SignatureBackend: Send + 'static {
    /// Prepares the backend for use. Called once, before the first other operation.
    fn init(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn generate_keypair(&mut self, level: FalconLevel) -> Result<Keypair, BackendError>;

    fn sign(
        &mut self,
        level: FalconLevel,
        message: &[u8],
        secret_key: &[u8],
    ) -> Result<Vec<u8>, BackendError>;

    /// Returns whether `signature` is valid for `message` under `public_key`.
    ///
    /// A malformed public key is an error; a malformed signature simply does not verify.
    fn verify(
        &mut self,
        level: FalconLevel,
        message: &[u8],
        signature: &[u8],
        public_key: &[u8],
    ) -> Result<bool, BackendError>;
}

// NATIVE FALCON
// ================================================================================================

/// A [SignatureBackend] running the Falcon implementation of this crate.
pub struct NativeFalcon<R> {
    rng: R,
}

impl NativeFalcon<ChaCha20Rng> {
    /// Creates a backend whose RNG is seeded from the thread-local OS-seeded generator.
    pub fn new() -> Self {
        Self::with_rng(ChaCha20Rng::from_rng(&mut rand::rng()))
    }
}

impl Default for NativeFalcon<ChaCha20Rng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng + CryptoRng> NativeFalcon<R> {
    /// Creates a backend drawing all randomness from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + CryptoRng + Send + 'static> SignatureBackend for NativeFalcon<R> {
    fn generate_keypair(&mut self, level: FalconLevel) -> Result<Keypair, BackendError> {
        let sk = SecretKey::with_rng(level, &mut self.rng)?;
        Ok(Keypair {
            public_key: sk.public_key().to_bytes(),
            secret_key: SecretBytes::new(sk.to_bytes()),
        })
    }

    fn sign(
        &mut self,
        level: FalconLevel,
        message: &[u8],
        secret_key: &[u8],
    ) -> Result<Vec<u8>, BackendError> {
        let sk = SecretKey::read_from_bytes(secret_key).map_err(|err| BackendError::Decoding {
            what: "secret key",
            reason: err.to_string(),
        })?;
        if sk.level() != level {
            return Err(BackendError::LevelMismatch {
                what: "secret key",
                expected: level,
                found: sk.level(),
            });
        }
        Ok(sk.sign_with_rng(message, &mut self.rng)?.to_bytes())
    }

    fn verify(
        &mut self,
        level: FalconLevel,
        message: &[u8],
        signature: &[u8],
        public_key: &[u8],
    ) -> Result<bool, BackendError> {
        let pk = PublicKey::read_from_bytes(public_key).map_err(|err| BackendError::Decoding {
            what: "public key",
            reason: err.to_string(),
        })?;
        if pk.level() != level {
            return Err(BackendError::LevelMismatch {
                what: "public key",
                expected: level,
                found: pk.level(),
            });
        }
        let Ok(signature) = Signature::read_from_bytes(signature) else {
            return Ok(false);
        };
        Ok(signature.level() == level && pk.verify(message, &signature))
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn backend(seed: u8) -> NativeFalcon<ChaCha20Rng> {
        NativeFalcon::with_rng(ChaCha20Rng::from_seed([seed; 32]))
    }

    #[test]
    fn native_backend_signs_and_verifies() {
        let mut backend = backend(0);
        let level = FalconLevel::Falcon512;
        let keypair = backend.generate_keypair(level).unwrap();
        assert_eq!(keypair.public_key.len(), level.params().pk_len);
        assert_eq!(keypair.secret_key.as_bytes().len(), level.params().sk_len);

        let message = b"hello";
        let signature = backend.sign(level, message, keypair.secret_key.as_bytes()).unwrap();
        assert_eq!(signature.len(), level.params().sig_len);

        assert!(backend.verify(level, message, &signature, &keypair.public_key).unwrap());
        assert!(!backend.verify(level, b"goodbye", &signature, &keypair.public_key).unwrap());
        assert!(!backend.verify(level, message, &signature[..10], &keypair.public_key).unwrap());
    }

    #[test]
    fn native_backend_checks_levels_and_encodings() {
        let mut backend = backend(1);
        let keypair = backend.generate_keypair(FalconLevel::Falcon512).unwrap();

        let result = backend.sign(FalconLevel::Falcon1024, b"m", keypair.secret_key.as_bytes());
        assert_matches!(
            result,
            Err(BackendError::LevelMismatch { found: FalconLevel::Falcon512, .. })
        );

        let result = backend.sign(FalconLevel::Falcon512, b"m", &[0x59, 1, 2, 3]);
        assert_matches!(result, Err(BackendError::Decoding { what: "secret key", .. }));

        let result = backend.verify(FalconLevel::Falcon512, b"m", &[], &[0x09]);
        assert_matches!(result, Err(BackendError::Decoding { what: "public key", .. }));
    }
}
