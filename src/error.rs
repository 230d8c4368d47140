//! Unified error types for the transfer engine
//!
//! Every fallible operation returns [`EngineResult`]. Errors are plain
//! serializable values so they can be folded into a `TransferResult`
//! at the module boundary without losing their category.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all engine operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn invalid_private_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPrivateKey, msg)
    }

    pub fn key_mismatch(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::KeyMismatch, msg)
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientFunds, msg)
    }

    pub fn insufficient_balance(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientBalance, msg)
    }

    pub fn network_unreachable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkUnreachable, msg)
    }

    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    pub fn broadcast_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BroadcastFailed, msg)
    }

    pub fn unsupported_asset(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedAsset, msg)
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotImplemented, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn crypto_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoError, msg)
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors (no network call made)
    InvalidInput,
    InvalidAddress,
    InvalidPrivateKey,
    KeyMismatch,

    // Funds
    InsufficientFunds,
    InsufficientBalance,
    NoUtxos,

    // Network errors
    NetworkUnreachable,
    NetworkError,
    Timeout,
    HttpStatus,
    RpcError,
    BroadcastFailed,

    // Routing
    UnsupportedAsset,
    NotImplemented,

    // Parse errors
    ParseError,
    JsonError,
    HexError,

    // Crypto
    CryptoError,

    // Internal
    ConfigError,
    Internal,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

// Conversions from common error types

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for EngineError {
    fn from(e: hex::FromHexError) -> Self {
        EngineError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::new(ErrorCode::Internal, e.to_string())
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EngineError::new(ErrorCode::Timeout, "Request timed out")
        } else if e.is_connect() {
            EngineError::new(ErrorCode::NetworkError, "Connection failed")
        } else if e.is_decode() {
            EngineError::new(ErrorCode::ParseError, e.to_string())
        } else {
            EngineError::new(ErrorCode::NetworkError, e.to_string())
        }
    }
}

impl From<bitcoin::secp256k1::Error> for EngineError {
    fn from(e: bitcoin::secp256k1::Error) -> Self {
        EngineError::new(ErrorCode::CryptoError, format!("Secp256k1 error: {}", e))
    }
}

impl From<ethers_signers::WalletError> for EngineError {
    fn from(e: ethers_signers::WalletError) -> Self {
        EngineError::new(ErrorCode::CryptoError, format!("Wallet error: {}", e))
    }
}

impl From<bincode::Error> for EngineError {
    fn from(e: bincode::Error) -> Self {
        EngineError::new(ErrorCode::Internal, format!("Serialization failed: {}", e))
    }
}
