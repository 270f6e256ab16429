//! Utilities used in this crate which can also be generally useful downstream.

use alloc::{string::String, vec::Vec};
use core::fmt::Write;

use thiserror::Error;
// Re-export serialization traits from winter-utils
pub use winter_utils::{
    ByteReader, ByteWriter, Deserializable, DeserializationError, Serializable, SliceReader,
};

pub mod zeroize {
    //! Scoped wiping of secret material.
    pub use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};
}

// UTILITY FUNCTIONS
// ================================================================================================

/// Renders a slice of bytes as a 0x-prefixed hex string.
pub fn bytes_to_hex_string(data: &[u8]) -> String {
    let mut s = String::with_capacity(2 * data.len() + 2);

    s.push_str("0x");
    for byte in data.iter() {
        // writing into a String cannot fail
        let _ = write!(s, "{byte:02x}");
    }

    s
}

/// Defines errors which can occur during parsing of hexadecimal strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexParseError {
    #[error("hex encoded data must have an even number of digits, found {0}")]
    OddLength(usize),
    #[error("hex encoded data must start with 0x prefix")]
    MissingPrefix,
    #[error("hex encoded data must contain only characters [0-9a-fA-F]")]
    InvalidChar,
}

/// Parses a 0x-prefixed hex string into bytes.
pub fn hex_to_bytes(value: &str) -> Result<Vec<u8>, HexParseError> {
    let digits = value.strip_prefix("0x").ok_or(HexParseError::MissingPrefix)?;
    if digits.len() % 2 != 0 {
        return Err(HexParseError::OddLength(digits.len()));
    }

    let nibble = |v: u8| match v {
        b'0'..=b'9' => Ok(v - b'0'),
        b'a'..=b'f' => Ok(v - b'a' + 10),
        b'A'..=b'F' => Ok(v - b'A' + 10),
        _ => Err(HexParseError::InvalidChar),
    };

    digits
        .as_bytes()
        .chunks_exact(2)
        .map(|pair| Ok((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

// TESTS
// ================================================================================================
