//! Esplora REST client (Blockstream / mempool.space)

use serde::Deserialize;

use super::transport::broadcast_rejection;
use super::Connection;
use crate::error::EngineResult;
use crate::types::Utxo;

#[derive(Debug, Default, Deserialize)]
struct TxoStats {
    #[serde(default)]
    funded_txo_sum: u64,
    #[serde(default)]
    spent_txo_sum: u64,
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    #[serde(default)]
    chain_stats: TxoStats,
    #[serde(default)]
    mempool_stats: TxoStats,
}

impl AddressInfo {
    /// Confirmed plus mempool balance in satoshis
    fn balance(&self) -> u64 {
        let funded = self.chain_stats.funded_txo_sum as i128 + self.mempool_stats.funded_txo_sum as i128;
        let spent = self.chain_stats.spent_txo_sum as i128 + self.mempool_stats.spent_txo_sum as i128;
        (funded - spent).max(0) as u64
    }
}

pub struct EsploraClient {
    conn: Connection,
}

impl EsploraClient {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn url(&self) -> &str {
        self.conn.url()
    }

    pub async fn utxos(&self, address: &str) -> EngineResult<Vec<Utxo>> {
        self.conn.get_json(&format!("/address/{}/utxo", address)).await
    }

    pub async fn balance(&self, address: &str) -> EngineResult<u64> {
        let info: AddressInfo = self.conn.get_json(&format!("/address/{}", address)).await?;
        Ok(info.balance())
    }

    /// `POST /tx` with the raw hex; the body of a successful answer is the txid.
    pub async fn broadcast(&self, raw_hex: &str) -> EngineResult<String> {
        let body = self
            .conn
            .post_text("/tx", raw_hex.to_string())
            .await
            .map_err(|e| broadcast_rejection("Bitcoin broadcast", e))?;
        Ok(body.trim().to_string())
    }
}
