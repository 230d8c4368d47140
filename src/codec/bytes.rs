//! Integer and byte-order helpers for Bitcoin serialization

use super::CodecError;

pub fn write_u32_le(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub fn write_u64_le(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Append a Bitcoin CompactSize integer.
///
/// - `< 0xfd`         -> 1 byte
/// - `<= 0xffff`      -> `0xfd` + u16
/// - `<= 0xffff_ffff` -> `0xfe` + u32
/// - otherwise        -> `0xff` + u64
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Encoded length of a CompactSize integer
pub fn varint_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Append a length-prefixed byte string
pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

pub fn reversed(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Parse a displayed (big-endian) txid into internal byte order.
pub fn txid_from_hex(txid: &str) -> Result<[u8; 32], CodecError> {
    let raw = hex::decode(txid.trim()).map_err(|e| CodecError::InvalidTxid(e.to_string()))?;
    if raw.len() != 32 {
        return Err(CodecError::InvalidTxid(format!(
            "expected 32 bytes, got {}",
            raw.len()
        )));
    }
    let mut out = [0u8; 32];
    for (dst, src) in out.iter_mut().zip(raw.iter().rev()) {
        *dst = *src;
    }
    Ok(out)
}

/// Display form of an internal-order hash (reversed hex)
pub fn txid_to_hex(hash: &[u8; 32]) -> String {
    hex::encode(reversed(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_boundaries() {
        let cases: [(u64, &str); 6] = [
            (0, "00"),
            (0xfc, "fc"),
            (0xfd, "fdfd00"),
            (0xffff, "fdffff"),
            (0x1_0000, "fe00000100"),
            (0x1_0000_0000, "ff0000000001000000"),
        ];
        for (value, expected) in cases {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            assert_eq!(hex::encode(&buf), expected, "value {:#x}", value);
            assert_eq!(buf.len(), varint_len(value));
        }
    }

    #[test]
    fn test_little_endian_helpers() {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, 2);
        write_u64_le(&mut buf, 600_000_000);
        assert_eq!(hex::encode(buf), "020000000046c32300000000");
    }

    #[test]
    fn test_txid_round_trip_reverses() {
        let display = "8ac60eb9575db5b2d987e29f301b5b819ea83a5c6579d282d189cc04b8e151ef";
        let internal = txid_from_hex(display).unwrap();
        assert_eq!(internal[0], 0xef);
        assert_eq!(internal[31], 0x8a);
        assert_eq!(txid_to_hex(&internal), display);
    }

    #[test]
    fn test_txid_rejects_wrong_length() {
        assert!(matches!(txid_from_hex("abcd"), Err(CodecError::InvalidTxid(_))));
        assert!(txid_from_hex("zz").is_err());
    }
}
