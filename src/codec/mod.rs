//! Codec and Primitives
//!
//! Byte-level building blocks for hand-assembled Bitcoin transactions:
//! little-endian integers, CompactSize varints, hashing, DER signatures
//! with low-S normalization, output scripts and bech32 segwit addresses.

pub mod address;
pub mod bytes;
pub mod der;
pub mod hash;
pub mod script;

use thiserror::Error;

use crate::error::{EngineError, ErrorCode};

/// Low-level encoding failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed DER signature: {0}")]
    InvalidDer(String),

    #[error("Invalid bech32 address: {0}")]
    InvalidBech32(String),

    #[error("Unsupported witness program: version {version}, {length} bytes")]
    InvalidWitnessProgram { version: u8, length: usize },

    #[error("Invalid txid: {0}")]
    InvalidTxid(String),

    #[error("Input index {index} out of range ({count} inputs)")]
    InputIndexOutOfRange { index: usize, count: usize },
}

impl From<CodecError> for EngineError {
    fn from(e: CodecError) -> Self {
        let code = match e {
            CodecError::InvalidBech32(_) | CodecError::InvalidWitnessProgram { .. } => {
                ErrorCode::InvalidAddress
            }
            CodecError::InvalidTxid(_) => ErrorCode::ParseError,
            CodecError::InvalidDer(_) => ErrorCode::CryptoError,
            CodecError::InputIndexOutOfRange { .. } => ErrorCode::Internal,
        };
        EngineError::new(code, e.to_string())
    }
}
