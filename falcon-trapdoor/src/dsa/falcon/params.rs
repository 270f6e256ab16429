use core::fmt;

use thiserror::Error;

// SECURITY LEVEL
// ================================================================================================

/// The two standard Falcon parameter sets, named by their ring degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FalconLevel {
    Falcon512,
    Falcon1024,
}

impl FalconLevel {
    /// Returns the full parameter set of this level.
    pub const fn params(self) -> &'static Parameters {
        match self {
            FalconLevel::Falcon512 => &FALCON_512,
            FalconLevel::Falcon1024 => &FALCON_1024,
        }
    }

    /// Ring degree n.
    pub const fn degree(self) -> usize {
        self.params().n
    }

    /// log2 of the ring degree, as written in the low nibble of encoding headers.
    pub const fn log_n(self) -> u8 {
        self.params().log_n
    }

    /// Resolves a level from the log2 of its ring degree.
    pub fn from_log_n(log_n: u8) -> Result<Self, ParameterError> {
        match log_n {
            9 => Ok(FalconLevel::Falcon512),
            10 => Ok(FalconLevel::Falcon1024),
            _ => Err(ParameterError::UnsupportedLogN(log_n)),
        }
    }
}

impl TryFrom<u16> for FalconLevel {
    type Error = ParameterError;

    fn try_from(degree: u16) -> Result<Self, Self::Error> {
        match degree {
            512 => Ok(FalconLevel::Falcon512),
            1024 => Ok(FalconLevel::Falcon1024),
            _ => Err(ParameterError::UnsupportedLevel(degree)),
        }
    }
}

impl From<FalconLevel> for u16 {
    fn from(level: FalconLevel) -> Self {
        level.degree() as u16
    }
}

impl fmt::Display for FalconLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Falcon-{}", self.degree())
    }
}

// PARAMETERS
// ================================================================================================

/// Constants of one Falcon parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Ring degree n of Z[x]/(x^n + 1).
    pub n: usize,
    pub log_n: u8,
    /// Standard deviation of the lattice Gaussian used for signing.
    pub sigma: f64,
    /// Lower bound on the standard deviations passed to the integer sampler.
    pub sigma_min: f64,
    /// Bound on the squared norm of (s1, s2).
    pub sig_bound: i64,
    /// Encoded public key length, header included.
    pub pk_len: usize,
    /// Encoded secret key length, header included.
    pub sk_len: usize,
    /// Encoded signature length, header, nonce and padding included.
    pub sig_len: usize,
    /// Bits per coefficient of f and g in the secret key encoding.
    pub fg_bits: u32,
    /// Bits per coefficient of F in the secret key encoding.
    pub big_f_bits: u32,
}

const FALCON_512: Parameters = Parameters {
    n: 512,
    log_n: 9,
    sigma: 165.7366171829776,
    sigma_min: 1.2778336969128337,
    sig_bound: 34034726,
    pk_len: 897,
    sk_len: 1281,
    sig_len: 666,
    fg_bits: 6,
    big_f_bits: 8,
};

const FALCON_1024: Parameters = Parameters {
    n: 1024,
    log_n: 10,
    sigma: 168.38857144654395,
    sigma_min: 1.298280334344292,
    sig_bound: 70265242,
    pk_len: 1793,
    sk_len: 2305,
    sig_len: 1280,
    fg_bits: 5,
    big_f_bits: 8,
};

// ERRORS
// ================================================================================================

/// Errors raised when resolving a parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("unsupported Falcon level {0}, expected 512 or 1024")]
    UnsupportedLevel(u16),
    #[error("unsupported ring degree 2^{0}, expected 2^9 or 2^10")]
    UnsupportedLogN(u8),
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use assert_matches::assert_matches;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(FalconLevel::Falcon512)]
    #[case(FalconLevel::Falcon1024)]
    fn encoded_lengths_match_the_packing_widths(#[case] level: FalconLevel) {
        let p = level.params();
        assert_eq!(1 << p.log_n, p.n);
        assert_eq!(p.pk_len, 1 + p.n * 14 / 8);
        assert_eq!(p.sk_len, 1 + (2 * p.fg_bits as usize + p.big_f_bits as usize) * p.n / 8);
        assert_eq!(FalconLevel::from_log_n(p.log_n), Ok(level));
        assert_eq!(FalconLevel::try_from(u16::from(level)), Ok(level));
    }

    #[test]
    fn unsupported_levels_are_rejected() {
        assert_matches!(FalconLevel::try_from(256u16), Err(ParameterError::UnsupportedLevel(256)));
        assert_matches!(FalconLevel::from_log_n(8), Err(ParameterError::UnsupportedLogN(8)));
        assert_eq!(FalconLevel::Falcon1024.to_string(), "Falcon-1024");
    }
}
