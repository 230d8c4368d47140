//! Public entry point
//!
//! [`TransferEngine`] owns the configuration, the HTTP transport and the
//! price cache, and exposes the four caller-facing operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::balances::BalanceAggregator;
use crate::chains::ChainContext;
use crate::config::EngineConfig;
use crate::dispatcher::{self, Dispatcher};
use crate::error::EngineResult;
use crate::fees::FeeEstimator;
use crate::rpc::{EndpointSelector, HttpTransport, Transport};
use crate::types::{Asset, BalanceMap, Chain, FeeEstimate, TransferRequest, TransferResult, ValidationResult};

pub struct TransferEngine {
    config: Arc<EngineConfig>,
    dispatcher: Dispatcher,
    fees: FeeEstimator,
    balances: BalanceAggregator,
}

impl TransferEngine {
    /// Engine over real HTTP. Fails if the configuration is invalid.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let transport = HttpTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Engine over a caller-supplied transport
    pub fn with_transport(config: EngineConfig, transport: Arc<dyn Transport>) -> EngineResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let selector = EndpointSelector::new(
            transport.clone(),
            config.probe_timeout(),
            config.request_timeout(),
        );
        let ctx = ChainContext::new(config.clone(), selector);
        Ok(Self {
            dispatcher: Dispatcher::new(ctx.clone()),
            fees: FeeEstimator::new(config.clone(), transport),
            balances: BalanceAggregator::new(ctx),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Route, validate, sign and broadcast. Never panics or returns `Err`;
    /// every failure is described by the result.
    pub async fn transfer_asset(&self, request: &TransferRequest) -> TransferResult {
        self.dispatcher.transfer_asset(request).await
    }

    pub fn validate_transfer_params(&self, request: &TransferRequest) -> ValidationResult {
        dispatcher::validate_transfer_params(request)
    }

    pub async fn estimate_transfer_fee(&self, asset: &Asset, amount: &str) -> EngineResult<FeeEstimate> {
        self.fees.estimate(asset, amount).await
    }

    pub async fn fetch_all_balances(&self, addresses: &BTreeMap<Chain, String>) -> BalanceMap {
        self.balances.fetch_all(addresses).await
    }
}
