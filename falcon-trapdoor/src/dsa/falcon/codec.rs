//! Bit-packed encodings of Falcon keys and signatures.
//!
//! All encoders pack bits most-significant first. Decoders are strict: they reject values out of
//! range, non-canonical encodings and non-zero padding, so that every accepted buffer has exactly
//! one preimage.

use alloc::vec::Vec;

use super::{FALCON_ENCODING_BITS, MAX_SIG_COEFFICIENT, MODULUS, math::FalconFelt};

// MOD-Q ENCODING
// ================================================================================================

/// Packs field elements at 14 bits each.
pub fn modq_encode(values: &[FalconFelt]) -> Vec<u8> {
    let mut out = Vec::with_capacity((values.len() * FALCON_ENCODING_BITS as usize).div_ceil(8));
    let mut acc = 0u32;
    let mut acc_len = 0;
    for value in values {
        acc = (acc << FALCON_ENCODING_BITS) | value.value() as u32;
        acc_len += FALCON_ENCODING_BITS;
        while acc_len >= 8 {
            acc_len -= 8;
            out.push((acc >> acc_len) as u8);
        }
    }
    if acc_len > 0 {
        out.push((acc << (8 - acc_len)) as u8);
    }
    out
}

/// Unpacks `n` field elements from exactly `ceil(14n / 8)` bytes.
pub fn modq_decode(bytes: &[u8], n: usize) -> Option<Vec<FalconFelt>> {
    if bytes.len() != (n * FALCON_ENCODING_BITS as usize).div_ceil(8) {
        return None;
    }
    let mut out = Vec::with_capacity(n);
    let mut acc = 0u32;
    let mut acc_len = 0;
    for &byte in bytes {
        acc = (acc << 8) | byte as u32;
        acc_len += 8;
        if acc_len >= FALCON_ENCODING_BITS {
            acc_len -= FALCON_ENCODING_BITS;
            let w = (acc >> acc_len) & ((1 << FALCON_ENCODING_BITS) - 1);
            if w >= MODULUS as u32 {
                return None;
            }
            out.push(FalconFelt::new(w as u16));
        }
    }
    (out.len() == n && acc & ((1 << acc_len) - 1) == 0).then_some(out)
}

// FIXED-WIDTH SIGNED ENCODING
// ================================================================================================

/// Packs small signed integers as `bits`-bit two's complement values.
///
/// Every value must lie in `[-(2^(bits-1) - 1), 2^(bits-1) - 1]`.
pub fn trim_i8_encode(values: &[i64], bits: u32) -> Option<Vec<u8>> {
    let limit = (1i64 << (bits - 1)) - 1;
    let mask = (1u32 << bits) - 1;
    let mut out = Vec::with_capacity((values.len() * bits as usize).div_ceil(8));
    let mut acc = 0u32;
    let mut acc_len = 0;
    for &value in values {
        if !(-limit..=limit).contains(&value) {
            return None;
        }
        acc = (acc << bits) | (value as u32 & mask);
        acc_len += bits;
        while acc_len >= 8 {
            acc_len -= 8;
            out.push((acc >> acc_len) as u8);
        }
    }
    if acc_len > 0 {
        out.push((acc << (8 - acc_len)) as u8);
    }
    Some(out)
}

/// Unpacks `n` signed `bits`-bit values, rejecting the unused value `-2^(bits-1)`.
pub fn trim_i8_decode(bytes: &[u8], n: usize, bits: u32) -> Option<Vec<i64>> {
    if bytes.len() != (n * bits as usize).div_ceil(8) {
        return None;
    }
    let mask = (1u32 << bits) - 1;
    let sign_bit = 1u32 << (bits - 1);
    let mut out = Vec::with_capacity(n);
    let mut acc = 0u32;
    let mut acc_len = 0;
    for &byte in bytes {
        acc = (acc << 8) | byte as u32;
        acc_len += 8;
        while acc_len >= bits && out.len() < n {
            acc_len -= bits;
            let w = (acc >> acc_len) & mask;
            if w == sign_bit {
                return None;
            }
            let value = if w & sign_bit != 0 { w as i64 - (1i64 << bits) } else { w as i64 };
            out.push(value);
        }
    }
    (out.len() == n && acc & ((1 << acc_len) - 1) == 0).then_some(out)
}

// COMPRESSED ENCODING
// ================================================================================================

/// Compresses signature coefficients into exactly `out_len` bytes, zero-padded.
///
/// Each coefficient is written as a sign bit, the low 7 bits of its absolute value, and the
/// remaining high bits in unary (that many zeros, then a one). Fails if a coefficient exceeds
/// 2047 in absolute value or the output does not fit.
pub fn comp_encode(values: &[i16], out_len: usize) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(out_len);
    let mut acc = 0u32;
    let mut acc_len = 0u32;
    for &value in values {
        if !(-MAX_SIG_COEFFICIENT..=MAX_SIG_COEFFICIENT).contains(&value) {
            return None;
        }
        let mut t = value.unsigned_abs() as u32;
        acc <<= 1;
        if value < 0 {
            acc |= 1;
        }
        acc = (acc << 7) | (t & 127);
        t >>= 7;
        acc_len += 8;

        acc = (acc << (t + 1)) | 1;
        acc_len += t + 1;

        while acc_len >= 8 {
            acc_len -= 8;
            out.push((acc >> acc_len) as u8);
        }
    }
    if acc_len > 0 {
        out.push((acc << (8 - acc_len)) as u8);
    }
    if out.len() > out_len {
        return None;
    }
    out.resize(out_len, 0);
    Some(out)
}

/// Decompresses `n` signature coefficients; everything after them must be zero.
pub fn comp_decode(bytes: &[u8], n: usize) -> Option<Vec<i16>> {
    let mut out = Vec::with_capacity(n);
    let mut input = bytes.iter();
    let mut acc = 0u32;
    let mut acc_len = 0u32;

    for _ in 0..n {
        // sign and low bits
        acc = (acc << 8) | *input.next()? as u32;
        let b = acc >> acc_len;
        let negative = b & 128 != 0;
        let mut m = (b & 127) as i16;

        // high bits, in unary
        loop {
            if acc_len == 0 {
                acc = (acc << 8) | *input.next()? as u32;
                acc_len = 8;
            }
            acc_len -= 1;
            if (acc >> acc_len) & 1 != 0 {
                break;
            }
            m += 128;
            if m > MAX_SIG_COEFFICIENT {
                return None;
            }
        }

        // -0 has no canonical encoding
        if negative && m == 0 {
            return None;
        }
        out.push(if negative { -m } else { m });
    }

    let padding_is_zero = acc & ((1 << acc_len) - 1) == 0 && input.all(|&byte| byte == 0);
    padding_is_zero.then_some(out)
}

// TESTS
// ================================================================================================
