use crate::utils::{ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable};

mod public_key;
pub use public_key::PublicKey;

mod secret_key;
pub use secret_key::SecretKey;

// TESTS
// ================================================================================================
