use std::{string::String, vec::Vec};

use falcon_trapdoor_derive::SilentDebug;

use crate::{dsa::falcon::FalconLevel, utils::zeroize::Zeroizing};

/// Correlation id carried by a request and echoed by its response.
pub type RequestId = u64;

// SECRET BYTES
// ================================================================================================

/// An encoded secret key in transit. The buffer is wiped when dropped.
#[derive(Clone, PartialEq, Eq, SilentDebug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SecretBytes(Zeroizing<Vec<u8>>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

// MESSAGES
// ================================================================================================

/// A request sent to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Request {
    pub id: RequestId,
    pub action: Action,
}

/// The operations a worker serves.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    /// Prepares the backend. Every other action initializes it on first use as well.
    Init,
    GenerateKeypair {
        level: FalconLevel,
    },
    Sign {
        level: FalconLevel,
        message: Vec<u8>,
        secret_key: SecretBytes,
    },
    Verify {
        level: FalconLevel,
        message: Vec<u8>,
        signature: Vec<u8>,
        public_key: Vec<u8>,
    },
}

impl Action {
    /// Short name of the action, safe to log.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::GenerateKeypair { .. } => "generate_keypair",
            Self::Sign { .. } => "sign",
            Self::Verify { .. } => "verify",
        }
    }
}

/// An encoded key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keypair {
    pub public_key: Vec<u8>,
    pub secret_key: SecretBytes,
}

/// The value produced by a successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reply {
    Ready,
    Keypair(Keypair),
    Signature(Vec<u8>),
    Verified(bool),
}

/// The single response to a request: the reply, or the reason the action failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Response {
    pub id: RequestId,
    pub outcome: Result<Reply, String>,
}
