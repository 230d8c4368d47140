//! Chain transfer modules
//!
//! Each module validates its inputs, checks the key against `fromAddress`
//! before touching the network, acquires a live endpoint, then builds,
//! signs and broadcasts. Errors never escape `transfer`; they are folded
//! into the returned [`TransferResult`].

pub mod bitcoin;
pub mod erc20;
pub mod evm;
pub mod solana;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::rpc::{Connection, EndpointSelector, Probe};
use crate::types::{Chain, TransferParams, TransferResult};

#[async_trait]
pub trait ChainTransfer: Send + Sync {
    async fn transfer(&self, params: &TransferParams<'_>) -> TransferResult;
}

/// What every chain module needs from the engine
#[derive(Clone)]
pub struct ChainContext {
    pub config: Arc<EngineConfig>,
    pub selector: EndpointSelector,
}

impl ChainContext {
    pub fn new(config: Arc<EngineConfig>, selector: EndpointSelector) -> Self {
        Self { config, selector }
    }

    /// Live connection for `chain` using its configured endpoint order
    pub async fn connect(&self, chain: Chain) -> EngineResult<Connection> {
        self.selector
            .acquire(chain, self.config.endpoints_for(chain), Probe::for_chain(chain))
            .await
    }
}
