//! Multi-chain balance aggregation
//!
//! One future per requested chain, plus one per registered token on EVM
//! chains. Every future is created before any is awaited and each acquires
//! its own endpoint, so total latency tracks the slowest chain rather than
//! the sum of all of them.

use ethers_core::types::U256;
use futures::future::join_all;
use std::collections::BTreeMap;

use crate::assets::{self, AssetInfo};
use crate::chains::erc20::Erc20;
use crate::chains::evm::parse_address;
use crate::chains::solana::parse_pubkey;
use crate::chains::ChainContext;
use crate::error::{EngineError, EngineResult};
use crate::rpc::esplora::EsploraClient;
use crate::rpc::evm::EvmRpc;
use crate::rpc::solana::SolanaRpc;
use crate::types::{BalanceMap, Chain};
use crate::utils::units::from_base_units;
use crate::{log_debug, log_warn};

// =============================================================================
// Types
// =============================================================================

/// One balance to look up
#[derive(Debug, Clone)]
struct BalanceQuery<'a> {
    asset: &'static AssetInfo,
    address: &'a str,
}

fn u256_units(value: U256, decimals: u8) -> f64 {
    from_base_units(u128::try_from(value).unwrap_or(u128::MAX), decimals)
}

/// Expand `{chain: address}` into per-asset queries.
///
/// Chains without a registered native asset are skipped.
fn plan_queries(addresses: &BTreeMap<Chain, String>) -> Vec<BalanceQuery<'_>> {
    let mut queries = Vec::new();
    for (chain, address) in addresses {
        let Some(native) = assets::native_asset(*chain) else {
            continue;
        };
        queries.push(BalanceQuery {
            asset: native,
            address: address.trim(),
        });
        if chain.is_evm() {
            queries.extend(assets::tokens_on(*chain).map(|asset| BalanceQuery {
                asset,
                address: address.trim(),
            }));
        }
    }
    queries
}

// =============================================================================
// Aggregator
// =============================================================================

pub struct BalanceAggregator {
    ctx: ChainContext,
}

impl BalanceAggregator {
    pub fn new(ctx: ChainContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, query: &BalanceQuery<'_>) -> EngineResult<f64> {
        let asset = query.asset;
        let chain = asset.chain;
        if !chain.is_implemented() {
            return Ok(0.0);
        }

        let conn = self.ctx.connect(chain).await?;
        match (chain, asset.contract) {
            (Chain::Bitcoin, _) => {
                let sats = EsploraClient::new(conn).balance(query.address).await?;
                Ok(from_base_units(sats as u128, asset.decimals))
            }
            (Chain::Solana, _) => {
                let owner = parse_pubkey(query.address, "owner")?;
                let lamports = SolanaRpc::new(conn).balance(&owner).await?;
                Ok(from_base_units(lamports as u128, asset.decimals))
            }
            (_, None) => {
                let owner = parse_address(query.address, "owner")?;
                let wei = EvmRpc::new(conn).balance(owner).await?;
                Ok(u256_units(wei, asset.decimals))
            }
            (_, Some(contract)) => {
                let owner = parse_address(query.address, "owner")?;
                let contract = parse_address(contract, "token contract")?;
                let rpc = EvmRpc::new(conn);
                let raw = Erc20::new(&rpc, contract).balance_of(owner).await?;
                Ok(u256_units(raw, asset.decimals))
            }
        }
    }

    /// Balances keyed by asset id. Every asset of every requested chain is
    /// present; failed lookups report `0.0`.
    pub async fn fetch_all(&self, addresses: &BTreeMap<Chain, String>) -> BalanceMap {
        let queries = plan_queries(addresses);
        let pending: Vec<_> = queries.iter().map(|query| self.fetch(query)).collect();
        let results = join_all(pending).await;

        let mut balances = BalanceMap::new();
        for (query, result) in queries.iter().zip(results) {
            let balance = result.unwrap_or_else(|e: EngineError| {
                log_warn!(
                    "balances::aggregator",
                    "Balance lookup failed",
                    asset = query.asset.id,
                    address = query.address,
                    error = e
                );
                0.0
            });
            balances.insert(query.asset.id.to_string(), balance);
        }
        log_debug!(
            "balances::aggregator",
            "Balances fetched",
            assets = balances.len()
        );
        balances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::testing::{context, endpoint};
    use crate::rpc::mock::MockTransport;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const BTC_ADDRESS: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const EVM_ADDRESS: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
    const SOL_ADDRESS: &str = "11111111111111111111111111111112";

    fn btc_stats() -> String {
        json!({
            "address": BTC_ADDRESS,
            "chain_stats": {"funded_txo_sum": 300000, "spent_txo_sum": 100000},
            "mempool_stats": {"funded_txo_sum": 50000, "spent_txo_sum": 0}
        })
        .to_string()
    }

    fn script_all(mock: &MockTransport, delay: Duration) {
        let btc = endpoint(Chain::Bitcoin);
        mock.on_get(&format!("{}/blocks/tip/height", btc), "850000");
        mock.on_get_delayed(&format!("{}/address/{}", btc, BTC_ADDRESS), &btc_stats(), delay);

        let eth = endpoint(Chain::Ethereum);
        mock.on_rpc(eth, "eth_blockNumber", json!("0x1"));
        mock.on_rpc_delayed(eth, "eth_getBalance", json!("0x1bc16d674ec80000"), delay);
        mock.on_rpc_delayed(eth, "eth_call", json!(format!("0x{:064x}", 25_500_000u64)), delay);

        let sol = endpoint(Chain::Solana);
        mock.on_rpc(sol, "getVersion", json!({"solana-core": "2.0.0"}));
        mock.on_rpc_delayed(
            sol,
            "getBalance",
            json!({"context": {"slot": 1}, "value": 1_500_000_000u64}),
            delay,
        );
    }

    fn addresses() -> BTreeMap<Chain, String> {
        [
            (Chain::Bitcoin, BTC_ADDRESS),
            (Chain::Ethereum, EVM_ADDRESS),
            (Chain::Solana, SOL_ADDRESS),
            (Chain::Cardano, "addr1qxy"),
        ]
        .into_iter()
        .map(|(chain, address)| (chain, address.to_string()))
        .collect()
    }

    #[test]
    fn test_plan_includes_tokens_on_evm_chains() {
        let mut addresses = BTreeMap::new();
        addresses.insert(Chain::Bsc, EVM_ADDRESS.to_string());
        let ids: Vec<&str> = plan_queries(&addresses).iter().map(|q| q.asset.id).collect();
        assert_eq!(ids, vec!["binancecoin", "usdt"]);
    }

    #[tokio::test]
    async fn test_fetch_all_balances() {
        let mock = Arc::new(MockTransport::new());
        script_all(&mock, Duration::ZERO);
        let aggregator = BalanceAggregator::new(context(&mock));

        let balances = aggregator.fetch_all(&addresses()).await;
        assert_eq!(balances["bitcoin"], 0.0025);
        assert_eq!(balances["ethereum"], 2.0);
        assert_eq!(balances["usdc"], 25.5);
        assert_eq!(balances["solana"], 1.5);
        assert_eq!(balances["cardano"], 0.0);
        assert_eq!(balances.len(), 5);
    }

    #[tokio::test]
    async fn test_failures_report_zero() {
        let mock = Arc::new(MockTransport::new());
        script_all(&mock, Duration::ZERO);
        let mut addresses = addresses();
        addresses.insert(Chain::Solana, "not-a-pubkey".to_string());
        // nothing scripted for BSC, so no endpoint is reachable
        addresses.insert(Chain::Bsc, EVM_ADDRESS.to_string());
        let aggregator = BalanceAggregator::new(context(&mock));

        let balances = aggregator.fetch_all(&addresses).await;
        assert_eq!(balances["solana"], 0.0);
        assert_eq!(balances["binancecoin"], 0.0);
        assert_eq!(balances["usdt"], 0.0);
        assert_eq!(balances["bitcoin"], 0.0025);
    }

    #[tokio::test]
    async fn test_latency_is_max_not_sum() {
        let delay = Duration::from_millis(150);
        let mock = Arc::new(MockTransport::new());
        script_all(&mock, delay);
        let aggregator = BalanceAggregator::new(context(&mock));

        let started = Instant::now();
        let balances = aggregator.fetch_all(&addresses()).await;
        let elapsed = started.elapsed();

        // four delayed lookups; sequential would take at least 600 ms
        assert!(elapsed < Duration::from_millis(450), "{:?}", elapsed);
        assert_eq!(balances["solana"], 1.5);
        assert_eq!(balances["usdc"], 25.5);
    }
}
