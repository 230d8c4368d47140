//! Chain Transfer Core Library
//!
//! Build, sign and broadcast value transfers on Bitcoin, Ethereum, BSC and
//! Solana from caller-supplied key material.
//!
//! # Architecture
//!
//! This crate provides:
//! - **dispatcher**: routes a transfer request to its chain module and
//!   validates parameters without touching the network
//! - **chains**: per-chain transfer modules (P2WPKH, EIP-1559/legacy EVM
//!   with ERC-20, Solana system transfers)
//! - **rpc**: endpoint failover and the Esplora / EVM / Solana clients
//! - **codec**: byte-level Bitcoin primitives (varints, DER, bech32, scripts)
//! - **fees**: gas-oracle and static fee estimates with USD conversion
//! - **balances**: concurrent multi-chain balance lookups
//!
//! # Security
//!
//! Key material is held in [`KeyMaterial`], which is zeroized on drop and
//! redacted from `Debug` output and logs. A key is always checked against
//! the claimed sender address before any network call.
//!
//! # Example
//!
//! ```rust,ignore
//! use chain_transfer::{Asset, EngineConfig, TransferEngine, TransferRequest};
//!
//! let engine = TransferEngine::new(EngineConfig::default())?;
//! let asset = Asset::new("bitcoin", "BTC", "Bitcoin").with_balance(0.01);
//! let request = TransferRequest::new(asset, from, to, "0.001", wif);
//! let result = engine.transfer_asset(&request).await;
//! ```

pub mod assets;
pub mod balances;
pub mod chains;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod fees;
pub mod rpc;
pub mod types;
pub mod utils;

// Re-export key types for convenience
pub use config::EngineConfig;
pub use dispatcher::validate_transfer_params;
pub use engine::TransferEngine;
pub use error::{EngineError, EngineResult, ErrorCode};
pub use types::*;
