//! Engine configuration
//!
//! Everything network-facing is configurable: ordered endpoint lists per
//! chain, timeouts, gas oracles, the spot-price source and the fallback
//! figures used when those are down. Every field has a default, so an
//! empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::{EngineError, EngineResult};
use crate::types::Chain;

/// Placeholder in `price_url` replaced by the comma-separated price ids
pub const PRICE_IDS_PLACEHOLDER: &str = "{ids}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Ordered candidates; the first live one wins.
    pub endpoints: BTreeMap<Chain, Vec<String>>,
    pub probe_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// How long to wait for a Solana signature to confirm after broadcast
    pub confirmation_timeout_ms: u64,
    pub confirmation_poll_ms: u64,
    /// Etherscan-style `gastracker` URLs
    pub gas_oracles: BTreeMap<Chain, String>,
    /// CoinGecko `simple/price` URL with an `{ids}` placeholder
    pub price_url: String,
    pub price_cache_ttl_secs: u64,
    pub fallback_gas_gwei: BTreeMap<Chain, f64>,
    /// USD prices keyed by price id, used when the price source fails
    pub fallback_prices_usd: BTreeMap<String, f64>,
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            Chain::Bitcoin,
            urls(&["https://blockstream.info/api", "https://mempool.space/api"]),
        );
        endpoints.insert(
            Chain::Ethereum,
            urls(&[
                "https://eth.llamarpc.com",
                "https://ethereum-rpc.publicnode.com",
                "https://rpc.ankr.com/eth",
            ]),
        );
        endpoints.insert(
            Chain::Bsc,
            urls(&[
                "https://bsc-dataseed.binance.org",
                "https://bsc-rpc.publicnode.com",
                "https://rpc.ankr.com/bsc",
            ]),
        );
        endpoints.insert(
            Chain::Solana,
            urls(&[
                "https://api.mainnet-beta.solana.com",
                "https://solana-rpc.publicnode.com",
            ]),
        );

        let mut gas_oracles = BTreeMap::new();
        gas_oracles.insert(
            Chain::Ethereum,
            "https://api.etherscan.io/api?module=gastracker&action=gasoracle".to_string(),
        );
        gas_oracles.insert(
            Chain::Bsc,
            "https://api.bscscan.com/api?module=gastracker&action=gasoracle".to_string(),
        );

        let mut fallback_gas_gwei = BTreeMap::new();
        fallback_gas_gwei.insert(Chain::Ethereum, 30.0);
        fallback_gas_gwei.insert(Chain::Bsc, 5.0);

        let fallback_prices_usd = [
            ("bitcoin", 60_000.0),
            ("ethereum", 2_500.0),
            ("binancecoin", 600.0),
            ("solana", 150.0),
            ("usd-coin", 1.0),
            ("tether", 1.0),
            ("ripple", 0.5),
            ("cardano", 0.35),
            ("dogecoin", 0.1),
            ("tron", 0.12),
        ]
        .into_iter()
        .map(|(id, price)| (id.to_string(), price))
        .collect();

        Self {
            endpoints,
            probe_timeout_ms: 4_000,
            request_timeout_ms: 5_000,
            confirmation_timeout_ms: 30_000,
            confirmation_poll_ms: 1_000,
            gas_oracles,
            price_url: format!(
                "https://api.coingecko.com/api/v3/simple/price?ids={}&vs_currencies=usd",
                PRICE_IDS_PLACEHOLDER
            ),
            price_cache_ttl_secs: 60,
            fallback_gas_gwei,
            fallback_prices_usd,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| EngineError::config_error(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config_error(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Check every URL and that the implemented chains have endpoints.
    pub fn validate(&self) -> EngineResult<()> {
        for chain in Chain::all().into_iter().filter(Chain::is_implemented) {
            if self.endpoints_for(chain).is_empty() {
                return Err(EngineError::config_error(format!(
                    "No endpoints configured for {}",
                    chain
                )));
            }
        }

        for (chain, list) in &self.endpoints {
            for endpoint in list {
                validate_endpoint_url(endpoint)
                    .map_err(|e| EngineError::config_error(format!("{} endpoint: {}", chain, e)))?;
            }
        }
        for (chain, oracle) in &self.gas_oracles {
            validate_endpoint_url(oracle)
                .map_err(|e| EngineError::config_error(format!("{} gas oracle: {}", chain, e)))?;
        }
        validate_endpoint_url(&self.price_url.replace(PRICE_IDS_PLACEHOLDER, "bitcoin"))
            .map_err(|e| EngineError::config_error(format!("price url: {}", e)))?;

        if self.probe_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(EngineError::config_error("Timeouts must be non-zero"));
        }
        Ok(())
    }

    pub fn endpoints_for(&self, chain: Chain) -> &[String] {
        self.endpoints.get(&chain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms)
    }

    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.price_cache_ttl_secs)
    }

    pub fn gas_oracle(&self, chain: Chain) -> Option<&str> {
        self.gas_oracles.get(&chain).map(String::as_str)
    }

    pub fn fallback_gas_gwei(&self, chain: Chain) -> f64 {
        self.fallback_gas_gwei.get(&chain).copied().unwrap_or(match chain {
            Chain::Bsc => 5.0,
            _ => 30.0,
        })
    }

    pub fn fallback_price(&self, price_id: &str) -> f64 {
        self.fallback_prices_usd.get(price_id).copied().unwrap_or(0.0)
    }

    pub fn price_url_for(&self, price_ids: &[&str]) -> String {
        self.price_url
            .replace(PRICE_IDS_PLACEHOLDER, &price_ids.join(","))
    }
}

/// HTTPS required, plain HTTP allowed for loopback only.
pub fn validate_endpoint_url(raw: &str) -> Result<Url, String> {
    let parsed = Url::parse(raw.trim()).map_err(|e| format!("invalid URL '{}': {}", raw, e))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| format!("URL '{}' has no host", raw))?;

    match parsed.scheme() {
        "https" => {}
        "http" if is_loopback(host) => {}
        "http" => return Err(format!("HTTPS required for remote endpoint '{}'", host)),
        other => return Err(format!("unsupported URL scheme '{}'", other)),
    }

    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err("credentials embedded in URL".to_string());
    }
    Ok(parsed)
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
}
