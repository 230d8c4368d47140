//! Bech32 / bech32m segwit addresses (BIP 173, BIP 350)

use bech32::{self, u5, ToBase32, Variant};

use super::CodecError;

/// Mainnet human-readable part
pub const BITCOIN_HRP: &str = "bc";

/// Decoded segwit destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessProgram {
    pub version: u8,
    pub program: Vec<u8>,
}

/// `bc1q…` address for a compressed-key hash
pub fn encode_p2wpkh(hrp: &str, pubkey_hash: &[u8; 20]) -> Result<String, CodecError> {
    let version = u5::try_from_u8(0).map_err(|e| CodecError::InvalidBech32(e.to_string()))?;
    let mut data = vec![version];
    data.extend(pubkey_hash.to_base32());
    bech32::encode(hrp, data, Variant::Bech32).map_err(|e| CodecError::InvalidBech32(e.to_string()))
}

/// Decode a segwit address, checking the hrp and the variant required by
/// the witness version (bech32 for v0, bech32m for v1+).
pub fn decode_segwit(expected_hrp: &str, address: &str) -> Result<WitnessProgram, CodecError> {
    let has_upper = address.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = address.chars().any(|c| c.is_ascii_lowercase());
    if has_upper && has_lower {
        return Err(CodecError::InvalidBech32("mixed case".into()));
    }

    let lower = address.to_lowercase();
    let (hrp, data, variant) =
        bech32::decode(&lower).map_err(|e| CodecError::InvalidBech32(e.to_string()))?;
    if hrp != expected_hrp {
        return Err(CodecError::InvalidBech32(format!(
            "expected hrp '{}', got '{}'",
            expected_hrp, hrp
        )));
    }

    let (version, rest) = data
        .split_first()
        .ok_or_else(|| CodecError::InvalidBech32("empty data part".into()))?;
    let version = version.to_u8();

    let expected_variant = if version == 0 { Variant::Bech32 } else { Variant::Bech32m };
    if variant != expected_variant {
        return Err(CodecError::InvalidBech32(format!(
            "wrong checksum variant for witness version {}",
            version
        )));
    }

    let five_bit: Vec<u8> = rest.iter().map(|b| b.to_u8()).collect();
    let program = bech32::convert_bits(&five_bit, 5, 8, false)
        .map_err(|e| CodecError::InvalidBech32(e.to_string()))?;

    let valid = match version {
        0 => program.len() == 20 || program.len() == 32,
        1..=16 => (2..=40).contains(&program.len()),
        _ => false,
    };
    if !valid {
        return Err(CodecError::InvalidWitnessProgram {
            version,
            length: program.len(),
        });
    }

    Ok(WitnessProgram { version, program })
}
