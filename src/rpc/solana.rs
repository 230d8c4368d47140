//! Solana JSON-RPC client

#![allow(deprecated)]

use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::{hash::Hash, message::Message, pubkey::Pubkey, transaction::Transaction};
use std::str::FromStr;

use super::transport::broadcast_rejection;
use super::Connection;
use crate::error::{EngineError, EngineResult};

/// Responses of the form `{ context, value }`
#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

/// Entry of `getSignatureStatuses`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status.as_deref(),
            Some("confirmed") | Some("finalized")
        )
    }
}

fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub struct SolanaRpc {
    conn: Connection,
}

impl SolanaRpc {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn url(&self) -> &str {
        self.conn.url()
    }

    /// Balance in lamports
    pub async fn balance(&self, pubkey: &Pubkey) -> EngineResult<u64> {
        let response: WithContext<u64> = self
            .conn
            .rpc_as(
                "getBalance",
                json!([pubkey.to_string(), { "commitment": "confirmed" }]),
            )
            .await?;
        Ok(response.value)
    }

    pub async fn latest_blockhash(&self) -> EngineResult<Hash> {
        let response: WithContext<BlockhashValue> = self
            .conn
            .rpc_as("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        Hash::from_str(&response.value.blockhash)
            .map_err(|e| EngineError::parse_error(format!("Invalid blockhash: {}", e)))
    }

    pub async fn fee_for_message(&self, message: &Message) -> EngineResult<u64> {
        let response: WithContext<Option<u64>> = self
            .conn
            .rpc_as(
                "getFeeForMessage",
                json!([encode_base64(&message.serialize()), { "commitment": "confirmed" }]),
            )
            .await?;
        response
            .value
            .ok_or_else(|| EngineError::rpc_error("getFeeForMessage: blockhash not found"))
    }

    pub async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> EngineResult<u64> {
        self.conn
            .rpc_as("getMinimumBalanceForRentExemption", json!([data_len]))
            .await
    }

    /// Submit a signed transaction, returning the signature the node reports.
    pub async fn send_transaction(&self, tx: &Transaction) -> EngineResult<String> {
        let wire = bincode::serialize(tx)?;
        let result = self
            .conn
            .rpc(
                "sendTransaction",
                json!([
                    encode_base64(&wire),
                    { "encoding": "base64", "preflightCommitment": "confirmed" }
                ]),
            )
            .await
            .map_err(|e| broadcast_rejection("Solana broadcast", e))?;
        match result {
            Value::String(signature) => Ok(signature),
            other => Err(EngineError::broadcast_failed(format!(
                "sendTransaction: unexpected result {}",
                other
            ))),
        }
    }

    pub async fn signature_status(&self, signature: &str) -> EngineResult<Option<SignatureStatus>> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .conn
            .rpc_as(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }
}
