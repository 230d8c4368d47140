//! EVM JSON-RPC client

use ethers_core::types::{Address, Bytes, U256};
use serde::Deserialize;
use serde_json::{json, Value};

use super::transport::broadcast_rejection;
use super::Connection;
use crate::error::{EngineError, EngineResult};

/// `eth_feeHistory` result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeHistory {
    /// One entry per block plus the projected next block (last)
    pub base_fee_per_gas: Vec<U256>,
    #[serde(default)]
    pub reward: Vec<Vec<U256>>,
}

impl FeeHistory {
    pub fn next_base_fee(&self) -> Option<U256> {
        self.base_fee_per_gas.last().copied()
    }

    /// Median across blocks of the first requested reward percentile,
    /// ignoring empty blocks.
    pub fn median_reward(&self) -> Option<U256> {
        let mut rewards: Vec<U256> = self
            .reward
            .iter()
            .filter_map(|r| r.first().copied())
            .filter(|r| !r.is_zero())
            .collect();
        if rewards.is_empty() {
            return None;
        }
        rewards.sort();
        Some(rewards[rewards.len() / 2])
    }
}

pub struct EvmRpc {
    conn: Connection,
}

impl EvmRpc {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn url(&self) -> &str {
        self.conn.url()
    }

    pub async fn balance(&self, address: Address) -> EngineResult<U256> {
        self.conn
            .rpc_as("eth_getBalance", json!([address, "latest"]))
            .await
    }

    pub async fn pending_nonce(&self, address: Address) -> EngineResult<U256> {
        self.conn
            .rpc_as("eth_getTransactionCount", json!([address, "pending"]))
            .await
    }

    pub async fn gas_price(&self) -> EngineResult<U256> {
        self.conn.rpc_as("eth_gasPrice", json!([])).await
    }

    pub async fn fee_history(&self, blocks: u64, percentile: f64) -> EngineResult<FeeHistory> {
        self.conn
            .rpc_as(
                "eth_feeHistory",
                json!([format!("{:#x}", blocks), "latest", [percentile]]),
            )
            .await
    }

    pub async fn estimate_gas(&self, from: Address, to: Address, data: &Bytes) -> EngineResult<U256> {
        self.conn
            .rpc_as(
                "eth_estimateGas",
                json!([{ "from": from, "to": to, "data": data }]),
            )
            .await
    }

    pub async fn call(&self, to: Address, data: &Bytes) -> EngineResult<Bytes> {
        self.conn
            .rpc_as("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    /// Submit a signed transaction. A node rejection is `BroadcastFailed`
    /// with the node's message.
    pub async fn send_raw_transaction(&self, raw: &Bytes) -> EngineResult<String> {
        let result = self
            .conn
            .rpc("eth_sendRawTransaction", json!([raw]))
            .await
            .map_err(|e| broadcast_rejection("EVM broadcast", e))?;
        match result {
            Value::String(hash) => Ok(hash),
            other => Err(EngineError::broadcast_failed(format!(
                "eth_sendRawTransaction: unexpected result {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gwei(n: u64) -> U256 {
        U256::from(n) * U256::exp10(9)
    }

    #[test]
    fn test_fee_history_parsing() {
        let raw = json!({
            "oldestBlock": "0x1312d00",
            "baseFeePerGas": ["0x3b9aca00", "0x4a817c800", "0x2540be400"],
            "gasUsedRatio": [0.5, 0.9],
            "reward": [["0x77359400"], ["0x0"], ["0x3b9aca00"]]
        });
        let history: FeeHistory = serde_json::from_value(raw).unwrap();
        assert_eq!(history.next_base_fee(), Some(gwei(10)));
        // zero-reward block ignored; median of [1, 2] gwei picks the upper
        assert_eq!(history.median_reward(), Some(gwei(2)));
    }

    #[test]
    fn test_fee_history_without_rewards() {
        let history: FeeHistory =
            serde_json::from_value(json!({"baseFeePerGas": ["0x1"]})).unwrap();
        assert_eq!(history.median_reward(), None);
    }
}
