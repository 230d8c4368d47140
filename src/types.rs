//! Shared types for the transfer engine
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{EngineError, ErrorCode};

// =============================================================================
// Chain Types
// =============================================================================

/// Networks the engine knows about.
///
/// Only Bitcoin, Ethereum, BSC and Solana have transfer modules; the rest
/// are recognized identities that resolve to explicit stubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Bitcoin,
    Ethereum,
    Bsc,
    Solana,
    Xrp,
    Cardano,
    Dogecoin,
    Tron,
}

impl Chain {
    pub fn is_evm(&self) -> bool {
        matches!(self, Chain::Ethereum | Chain::Bsc)
    }

    pub fn is_implemented(&self) -> bool {
        matches!(
            self,
            Chain::Bitcoin | Chain::Ethereum | Chain::Bsc | Chain::Solana
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "BTC",
            Chain::Ethereum => "ETH",
            Chain::Bsc => "BNB",
            Chain::Solana => "SOL",
            Chain::Xrp => "XRP",
            Chain::Cardano => "ADA",
            Chain::Dogecoin => "DOGE",
            Chain::Tron => "TRX",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "Bitcoin",
            Chain::Ethereum => "Ethereum",
            Chain::Bsc => "BNB Smart Chain",
            Chain::Solana => "Solana",
            Chain::Xrp => "XRP",
            Chain::Cardano => "Cardano",
            Chain::Dogecoin => "Dogecoin",
            Chain::Tron => "Tron",
        }
    }

    pub fn all() -> [Chain; 8] {
        [
            Chain::Bitcoin,
            Chain::Ethereum,
            Chain::Bsc,
            Chain::Solana,
            Chain::Xrp,
            Chain::Cardano,
            Chain::Dogecoin,
            Chain::Tron,
        ]
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "bsc" | "bnb" | "binance" => Ok(Chain::Bsc),
            "solana" | "sol" => Ok(Chain::Solana),
            "xrp" | "ripple" => Ok(Chain::Xrp),
            "cardano" | "ada" => Ok(Chain::Cardano),
            "dogecoin" | "doge" => Ok(Chain::Dogecoin),
            "tron" | "trx" => Ok(Chain::Tron),
            _ => Err(format!("Unknown chain: {}", s)),
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Asset as held by the caller. Immutable for the duration of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// Overrides the registry default when present.
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub price: f64,
}

impl Asset {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            decimals: None,
            balance: 0.0,
            price: 0.0,
        }
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = Some(decimals);
        self
    }
}

/// Raw secret key material as supplied by the caller.
///
/// Zeroized on drop and never printed.
#[derive(Clone)]
pub struct KeyMaterial(Zeroizing<String>);

impl KeyMaterial {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED:{}chars])", self.0.len())
    }
}

impl<'de> Deserialize<'de> for KeyMaterial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(KeyMaterial::new)
    }
}

impl From<&str> for KeyMaterial {
    fn from(s: &str) -> Self {
        KeyMaterial::new(s)
    }
}

/// A single transfer request. Constructed per call, never persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub asset: Option<Asset>,
    pub from_address: String,
    pub to_address: String,
    /// Decimal amount in asset units, e.g. "0.001"
    pub amount: String,
    pub private_key: KeyMaterial,
}

impl TransferRequest {
    pub fn new(
        asset: Asset,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        amount: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            asset: Some(asset),
            from_address: from_address.into(),
            to_address: to_address.into(),
            amount: amount.into(),
            private_key: KeyMaterial::new(private_key),
        }
    }

    /// Borrowed view handed to chain modules once routing succeeded.
    pub fn params(&self) -> TransferParams<'_> {
        TransferParams {
            from_address: self.from_address.trim(),
            to_address: self.to_address.trim(),
            amount: self.amount.trim(),
            private_key: &self.private_key,
        }
    }
}

/// What a chain module needs to execute a transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferParams<'a> {
    pub from_address: &'a str,
    pub to_address: &'a str,
    pub amount: &'a str,
    pub private_key: &'a KeyMaterial,
}

// =============================================================================
// Result Types
// =============================================================================

/// Terminal outcome of a transfer call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl TransferResult {
    pub fn ok(tx_hash: impl Into<String>) -> Self {
        Self {
            success: true,
            tx_hash: Some(tx_hash.into()),
            error: None,
            error_code: None,
        }
    }

    pub fn failed(error: EngineError) -> Self {
        Self {
            success: false,
            tx_hash: None,
            error: Some(error.message),
            error_code: Some(error.code),
        }
    }

    /// The transaction reached the network but the chain reported it failed.
    pub fn failed_on_chain(tx_hash: impl Into<String>, error: EngineError) -> Self {
        Self {
            tx_hash: Some(tx_hash.into()),
            ..Self::failed(error)
        }
    }
}

impl From<Result<String, EngineError>> for TransferResult {
    fn from(result: Result<String, EngineError>) -> Self {
        match result {
            Ok(hash) => TransferResult::ok(hash),
            Err(e) => TransferResult::failed(e),
        }
    }
}

/// Outcome of the network-free parameter check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { valid: true, error: None }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// Fee Types
// =============================================================================

/// Where a fee figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeSource {
    /// Live gas oracle
    Live,
    /// Oracle unreachable, fixed conservative value used
    Fallback,
    /// Static per-chain table
    Static,
}

/// Expected network fee for a transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    /// Fee in units of `fee_currency`
    pub fee: f64,
    pub fee_usd: f64,
    pub fee_currency: String,
    pub source: FeeSource,
    /// amount + fee, when the fee is paid in the transferred asset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_in_asset: Option<f64>,
}

// =============================================================================
// Chain Data Types
// =============================================================================

/// Spendable Bitcoin output as returned by Esplora
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}

/// Balances keyed by asset id
pub type BalanceMap = BTreeMap<String, f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_from_str() {
        assert_eq!("BSC".parse::<Chain>().unwrap(), Chain::Bsc);
        assert_eq!("sol".parse::<Chain>().unwrap(), Chain::Solana);
        assert!("litecoin".parse::<Chain>().is_err());
    }

    #[test]
    fn test_key_material_debug_is_redacted() {
        let key = KeyMaterial::new("deadbeef");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("deadbeef"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_transfer_request_from_json() {
        let json = r#"{
            "asset": {"id": "bitcoin", "symbol": "BTC", "name": "Bitcoin", "balance": 1.0, "price": 60000.0},
            "fromAddress": "bc1qfrom",
            "toAddress": "bc1qto",
            "amount": "0.5",
            "privateKey": "00"
        }"#;
        let req: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.asset.as_ref().unwrap().id, "bitcoin");
        assert_eq!(req.params().amount, "0.5");
        assert_eq!(req.private_key.expose(), "00");
    }

    #[test]
    fn test_transfer_result_wire_format() {
        let result = TransferResult::failed(EngineError::not_implemented(
            "Cardano transfer not implemented yet",
        ));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Cardano transfer not implemented yet");
        assert_eq!(json["errorCode"], "not_implemented");
        assert!(json.get("txHash").is_none());
    }
}
