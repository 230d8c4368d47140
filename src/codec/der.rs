//! DER signature encoding with low-S normalization (BIP 62 / BIP 66)
//!
//! Signatures arrive as fixed-width `(r, s)` scalars and leave as the
//! variable-length `SEQUENCE { INTEGER r, INTEGER s }` Bitcoin expects.

use std::cmp::Ordering;

use super::CodecError;

/// secp256k1 group order `n`
pub const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// `n / 2`, the largest canonical `s`
pub const HALF_CURVE_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

const SEQUENCE_TAG: u8 = 0x30;
const INTEGER_TAG: u8 = 0x02;

fn compare_be(a: &[u8; 32], b: &[u8; 32]) -> Ordering {
    a.iter().cmp(b.iter())
}

/// `a - b` for big-endian 256-bit values, `a >= b`
fn sub_be(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = a[i] as i16 - b[i] as i16 - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = diff as u8;
    }
    out
}

pub fn is_low_s(s: &[u8; 32]) -> bool {
    compare_be(s, &HALF_CURVE_ORDER) != Ordering::Greater
}

/// Replace `s` with `n - s` when `s > n/2`.
pub fn normalize_s(s: &[u8; 32]) -> [u8; 32] {
    if is_low_s(s) {
        *s
    } else {
        sub_be(&CURVE_ORDER, s)
    }
}

/// Minimal DER INTEGER body for an unsigned big-endian scalar
fn der_integer(value: &[u8; 32]) -> Vec<u8> {
    let first_nonzero = value.iter().position(|b| *b != 0).unwrap_or(31);
    let trimmed = &value[first_nonzero..];
    let mut out = Vec::with_capacity(33);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

/// Encode `(r, s)` as DER, forcing low-S.
pub fn encode_signature(r: &[u8; 32], s: &[u8; 32]) -> Vec<u8> {
    let s = normalize_s(s);
    let r_bytes = der_integer(r);
    let s_bytes = der_integer(&s);

    let body_len = 2 + r_bytes.len() + 2 + s_bytes.len();
    let mut out = Vec::with_capacity(2 + body_len);
    out.push(SEQUENCE_TAG);
    out.push(body_len as u8);
    out.push(INTEGER_TAG);
    out.push(r_bytes.len() as u8);
    out.extend_from_slice(&r_bytes);
    out.push(INTEGER_TAG);
    out.push(s_bytes.len() as u8);
    out.extend_from_slice(&s_bytes);
    out
}

/// Encode a 64-byte compact `r || s` signature as DER.
pub fn encode_compact(compact: &[u8; 64]) -> Vec<u8> {
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&compact[..32]);
    s.copy_from_slice(&compact[32..]);
    encode_signature(&r, &s)
}

fn read_integer(data: &[u8], pos: usize) -> Result<([u8; 32], usize), CodecError> {
    if data.get(pos) != Some(&INTEGER_TAG) {
        return Err(CodecError::InvalidDer("expected INTEGER tag".into()));
    }
    let len = *data
        .get(pos + 1)
        .ok_or_else(|| CodecError::InvalidDer("truncated integer length".into()))?
        as usize;
    let start = pos + 2;
    let end = start + len;
    if len == 0 || end > data.len() {
        return Err(CodecError::InvalidDer("integer length out of bounds".into()));
    }
    let mut bytes = &data[start..end];
    if bytes[0] & 0x80 != 0 {
        return Err(CodecError::InvalidDer("negative integer".into()));
    }
    if bytes.len() > 1 && bytes[0] == 0 && bytes[1] & 0x80 == 0 {
        return Err(CodecError::InvalidDer("non-minimal integer padding".into()));
    }
    if bytes[0] == 0 && bytes.len() > 1 {
        bytes = &bytes[1..];
    }
    if bytes.len() > 32 {
        return Err(CodecError::InvalidDer("integer wider than 256 bits".into()));
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(bytes);
    Ok((out, end))
}

/// Strict DER decode back into `(r, s)`.
pub fn decode_signature(der: &[u8]) -> Result<([u8; 32], [u8; 32]), CodecError> {
    if der.len() < 8 || der[0] != SEQUENCE_TAG {
        return Err(CodecError::InvalidDer("missing SEQUENCE header".into()));
    }
    if der[1] as usize != der.len() - 2 {
        return Err(CodecError::InvalidDer(format!(
            "sequence length {} does not match payload {}",
            der[1],
            der.len() - 2
        )));
    }
    let (r, next) = read_integer(der, 2)?;
    let (s, end) = read_integer(der, next)?;
    if end != der.len() {
        return Err(CodecError::InvalidDer("trailing bytes".into()));
    }
    Ok((r, s))
}
