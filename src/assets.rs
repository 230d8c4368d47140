//! Asset registry
//!
//! The explicit mapping from an asset id to the chain that moves it, the
//! token contract (if any), default decimals and the spot-price id.
//! Lookups are case-insensitive and accept a few common aliases.

use crate::types::{Asset, Chain};

/// USDC on Ethereum mainnet
pub const USDC_ETHEREUM: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
/// Binance-Peg USDT on BSC (18 decimals, unlike Ethereum USDT)
pub const USDT_BSC: &str = "0x55d398326f99059fF775485246999027B3197955";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetInfo {
    pub id: &'static str,
    pub aliases: &'static [&'static str],
    pub symbol: &'static str,
    pub name: &'static str,
    pub chain: Chain,
    pub decimals: u8,
    /// ERC-20 contract for token assets
    pub contract: Option<&'static str>,
    /// CoinGecko id
    pub price_id: &'static str,
}

impl AssetInfo {
    pub fn is_token(&self) -> bool {
        self.contract.is_some()
    }

    /// Decimals from the caller's asset when given, else the registry default.
    pub fn decimals_for(&self, asset: &Asset) -> u8 {
        asset.decimals.unwrap_or(self.decimals)
    }
}

/// How a transfer of an asset is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Bitcoin,
    EvmNative(Chain),
    EvmToken { chain: Chain, contract: &'static str },
    Solana,
    /// Recognized but without a transfer module
    Unimplemented(Chain),
}

impl AssetInfo {
    pub fn route(&self) -> Route {
        match (self.chain, self.contract) {
            (Chain::Bitcoin, _) => Route::Bitcoin,
            (Chain::Solana, _) => Route::Solana,
            (chain, Some(contract)) if chain.is_evm() => Route::EvmToken { chain, contract },
            (chain, None) if chain.is_evm() => Route::EvmNative(chain),
            (chain, _) => Route::Unimplemented(chain),
        }
    }
}

const fn native(
    id: &'static str,
    aliases: &'static [&'static str],
    chain: Chain,
    symbol: &'static str,
    name: &'static str,
    decimals: u8,
    price_id: &'static str,
) -> AssetInfo {
    AssetInfo {
        id,
        aliases,
        symbol,
        name,
        chain,
        decimals,
        contract: None,
        price_id,
    }
}

pub static REGISTRY: &[AssetInfo] = &[
    native("bitcoin", &["btc"], Chain::Bitcoin, "BTC", "Bitcoin", 8, "bitcoin"),
    native("ethereum", &["eth"], Chain::Ethereum, "ETH", "Ethereum", 18, "ethereum"),
    native("binancecoin", &["bnb", "bsc"], Chain::Bsc, "BNB", "BNB", 18, "binancecoin"),
    native("solana", &["sol"], Chain::Solana, "SOL", "Solana", 9, "solana"),
    AssetInfo {
        id: "usdc",
        aliases: &["usd-coin"],
        symbol: "USDC",
        name: "USD Coin",
        chain: Chain::Ethereum,
        decimals: 6,
        contract: Some(USDC_ETHEREUM),
        price_id: "usd-coin",
    },
    AssetInfo {
        id: "usdt",
        aliases: &["tether", "usdt-bsc"],
        symbol: "USDT",
        name: "Tether USD (BSC)",
        chain: Chain::Bsc,
        decimals: 18,
        contract: Some(USDT_BSC),
        price_id: "tether",
    },
    native("ripple", &["xrp"], Chain::Xrp, "XRP", "XRP", 6, "ripple"),
    native("cardano", &["ada"], Chain::Cardano, "ADA", "Cardano", 6, "cardano"),
    native("dogecoin", &["doge"], Chain::Dogecoin, "DOGE", "Dogecoin", 8, "dogecoin"),
    native("tron", &["trx"], Chain::Tron, "TRX", "Tron", 6, "tron"),
];

pub fn lookup(id: &str) -> Option<&'static AssetInfo> {
    let id = id.trim().to_ascii_lowercase();
    REGISTRY
        .iter()
        .find(|info| info.id == id || info.aliases.iter().any(|alias| *alias == id))
}

/// Native asset of a chain
pub fn native_asset(chain: Chain) -> Option<&'static AssetInfo> {
    REGISTRY
        .iter()
        .find(|info| info.chain == chain && info.contract.is_none())
}

/// Token assets living on a chain
pub fn tokens_on(chain: Chain) -> impl Iterator<Item = &'static AssetInfo> {
    REGISTRY
        .iter()
        .filter(move |info| info.chain == chain && info.contract.is_some())
}
