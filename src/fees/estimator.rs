//! Fee Estimator
//!
//! Expected network fee for a transfer, in the chain's fee currency and in
//! USD. EVM chains read a live gas price from an Etherscan-style oracle;
//! the remaining chains use a static per-chain table.

use serde::Deserialize;
use std::sync::Arc;

use super::prices::PriceOracle;
use crate::assets::{self, AssetInfo};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::rpc::Transport;
use crate::types::{Asset, Chain, FeeEstimate, FeeSource};
use crate::utils::units::parse_decimal;
use crate::{log_debug, log_warn};

// =============================================================================
// Constants
// =============================================================================

pub const NATIVE_TRANSFER_GAS: u64 = 21_000;
pub const TOKEN_TRANSFER_GAS: u64 = 65_000;

/// Flat fee in the chain's native unit for chains without a live source
pub fn static_fee(chain: Chain) -> Option<f64> {
    match chain {
        Chain::Bitcoin => Some(0.000014),
        Chain::Solana => Some(0.000005),
        Chain::Xrp => Some(0.000012),
        Chain::Cardano => Some(0.17),
        Chain::Dogecoin => Some(0.01),
        Chain::Tron => Some(1.0),
        Chain::Ethereum | Chain::Bsc => None,
    }
}

// =============================================================================
// Gas Oracle
// =============================================================================

#[derive(Debug, Deserialize)]
struct GasOracleResponse {
    result: GasOracleResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GasOracleResult {
    propose_gas_price: String,
}

/// `result.ProposeGasPrice` in gwei
pub fn parse_gas_oracle(body: &str) -> EngineResult<f64> {
    let response: GasOracleResponse = serde_json::from_str(body)
        .map_err(|e| EngineError::parse_error(format!("Invalid gas oracle response: {}", e)))?;
    let gwei = response
        .result
        .propose_gas_price
        .trim()
        .parse::<f64>()
        .map_err(|_| EngineError::parse_error("ProposeGasPrice is not a number"))?;
    if !gwei.is_finite() || gwei <= 0.0 {
        return Err(EngineError::parse_error("ProposeGasPrice must be positive"));
    }
    Ok(gwei)
}

// =============================================================================
// Estimator
// =============================================================================

pub struct FeeEstimator {
    config: Arc<EngineConfig>,
    transport: Arc<dyn Transport>,
    prices: PriceOracle,
}

impl FeeEstimator {
    pub fn new(config: Arc<EngineConfig>, transport: Arc<dyn Transport>) -> Self {
        let prices = PriceOracle::new(config.clone(), transport.clone());
        Self {
            config,
            transport,
            prices,
        }
    }

    /// Gas price in gwei, live when the oracle answers.
    async fn gas_price_gwei(&self, chain: Chain) -> (f64, FeeSource) {
        let live = match self.config.gas_oracle(chain) {
            Some(url) => self
                .transport
                .get_text(url, self.config.request_timeout())
                .await
                .and_then(|body| parse_gas_oracle(&body)),
            None => Err(EngineError::config_error("No gas oracle configured")),
        };
        match live {
            Ok(gwei) => (gwei, FeeSource::Live),
            Err(e) => {
                let fallback = self.config.fallback_gas_gwei(chain);
                log_warn!(
                    "fees::estimator",
                    "Gas oracle unavailable, using fallback",
                    chain = chain,
                    fallback_gwei = fallback,
                    error = e
                );
                (fallback, FeeSource::Fallback)
            }
        }
    }

    async fn native_price(&self, chain: Chain) -> f64 {
        match assets::native_asset(chain) {
            Some(native) => self.prices.usd_price(native.price_id).await,
            None => 0.0,
        }
    }

    pub async fn estimate(&self, asset: &Asset, amount: &str) -> EngineResult<FeeEstimate> {
        let info: &AssetInfo = assets::lookup(&asset.id).ok_or_else(|| {
            EngineError::unsupported_asset(format!("Unsupported asset: {}", asset.id))
        })?;
        let amount = if amount.trim().is_empty() {
            0.0
        } else {
            parse_decimal(amount)?
        };
        let chain = info.chain;
        let fee_currency = chain.symbol().to_string();

        let (fee, source, fee_usd) = match static_fee(chain) {
            Some(fee) => {
                let price = if asset.price > 0.0 && asset.symbol.eq_ignore_ascii_case(&fee_currency) {
                    asset.price
                } else {
                    self.native_price(chain).await
                };
                (fee, FeeSource::Static, fee * price)
            }
            None => {
                let gas_limit = if info.is_token() {
                    TOKEN_TRANSFER_GAS
                } else {
                    NATIVE_TRANSFER_GAS
                };
                let (gwei, source) = self.gas_price_gwei(chain).await;
                let fee = gwei * gas_limit as f64 / 1e9;
                (fee, source, fee * self.native_price(chain).await)
            }
        };

        let total_in_asset = asset
            .symbol
            .eq_ignore_ascii_case(&fee_currency)
            .then_some(amount + fee);

        log_debug!(
            "fees::estimator",
            "Fee estimated",
            asset = info.id,
            fee = fee,
            fee_usd = fee_usd
        );

        Ok(FeeEstimate {
            fee,
            fee_usd,
            fee_currency,
            source,
            total_in_asset,
        })
    }
}
