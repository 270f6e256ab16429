use alloc::string::ToString;

use super::{
    super::{
        FalconLevel, Signature,
        codec::{modq_decode, modq_encode},
        math::{FalconFelt, Polynomial, TrapdoorError},
    },
    ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable,
};

// PUBLIC KEY
// ================================================================================================

/// A Falcon public key: the polynomial h = g / f mod q.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    level: FalconLevel,
    h: Polynomial<FalconFelt>,
}

impl PublicKey {
    /// Wraps the public polynomial `h`, which must have the ring degree of `level`.
    pub fn new(level: FalconLevel, h: Polynomial<FalconFelt>) -> Result<Self, TrapdoorError> {
        if h.len() != level.degree() {
            return Err(TrapdoorError::InvalidDegree(h.len()));
        }
        Ok(Self { level, h })
    }

    pub fn level(&self) -> FalconLevel {
        self.level
    }

    /// Returns the public key polynomial h.
    pub fn h(&self) -> &Polynomial<FalconFelt> {
        &self.h
    }

    /// Verifies the provided signature against provided message and this public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        signature.verify(message, self)
    }
}

// SERIALIZATION / DESERIALIZATION
// ================================================================================================

impl Serializable for PublicKey {
    fn write_into<W: ByteWriter>(&self, target: &mut W) {
        target.write_u8(self.level.log_n());
        target.write_bytes(&modq_encode(&self.h.coefficients));
    }

    fn get_size_hint(&self) -> usize {
        self.level.params().pk_len
    }
}

impl Deserializable for PublicKey {
    fn read_from<R: ByteReader>(source: &mut R) -> Result<Self, DeserializationError> {
        let header = source.read_u8()?;
        if header & 0xf0 != 0 {
            return Err(DeserializationError::InvalidValue(format!(
                "Failed to decode public key: invalid header {header:#04x}"
            )));
        }
        let level = FalconLevel::from_log_n(header)
            .map_err(|err| DeserializationError::InvalidValue(err.to_string()))?;

        let body = source.read_vec(level.params().pk_len - 1)?;
        let coefficients = modq_decode(&body, level.degree()).ok_or_else(|| {
            DeserializationError::InvalidValue(
                "Failed to decode public key: invalid encoding".to_string(),
            )
        })?;

        Ok(Self { level, h: Polynomial::new(coefficients) })
    }
}
