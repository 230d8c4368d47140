//! Output scripts and the BIP143 scriptCode

use super::CodecError;

const OP_0: u8 = 0x00;
const OP_1: u8 = 0x51;
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const PUSH_20: u8 = 0x14;

/// `OP_0 <20-byte pubkey hash>`
pub fn p2wpkh_script(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.push(OP_0);
    script.push(PUSH_20);
    script.extend_from_slice(pubkey_hash);
    script
}

/// scriptPubKey for any segwit destination: `OP_n <program>`.
pub fn witness_program_script(version: u8, program: &[u8]) -> Result<Vec<u8>, CodecError> {
    let valid_length = match version {
        0 => program.len() == 20 || program.len() == 32,
        1..=16 => (2..=40).contains(&program.len()),
        _ => false,
    };
    if !valid_length {
        return Err(CodecError::InvalidWitnessProgram {
            version,
            length: program.len(),
        });
    }

    let mut script = Vec::with_capacity(2 + program.len());
    script.push(if version == 0 { OP_0 } else { OP_1 + version - 1 });
    script.push(program.len() as u8);
    script.extend_from_slice(program);
    Ok(script)
}

/// P2WPKH scriptCode as committed to by the BIP143 preimage:
/// `OP_DUP OP_HASH160 <h160> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script_code(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(PUSH_20);
    script.extend_from_slice(pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}
