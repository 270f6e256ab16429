use alloc::vec::Vec;

use sha3::{
    Shake256,
    digest::{ExtendableOutput, Update, XofReader},
};

use super::{
    MODULUS, Nonce,
    math::{FalconFelt, Polynomial},
};

/// Returns a polynomial in Z_q[x]/(x^n + 1) representing the hash of the provided nonce and
/// message, using SHAKE256 with rejection sampling.
///
/// The XOF output is read as 16-bit big-endian integers; a value t is accepted if t < 5q and
/// contributes the coefficient t mod q.
pub fn hash_to_point(nonce: &Nonce, message: &[u8], n: usize) -> Polynomial<FalconFelt> {
    const K: u32 = (1u32 << 16) / MODULUS as u32;

    let mut hasher = Shake256::default();
    hasher.update(nonce.as_bytes());
    hasher.update(message);
    let mut reader = hasher.finalize_xof();

    let mut coefficients: Vec<FalconFelt> = Vec::with_capacity(n);
    while coefficients.len() != n {
        let mut randomness = [0u8; 2];
        reader.read(&mut randomness);
        let t = u16::from_be_bytes(randomness) as u32;
        if t < K * MODULUS as u32 {
            coefficients.push(FalconFelt::new((t % MODULUS as u32) as u16));
        }
    }

    Polynomial::new(coefficients)
}

// TESTS
// ================================================================================================
