//! Transfer dispatch and parameter validation
//!
//! Routing happens before validation so that recognized-but-unbuilt
//! chains always answer with their stub message, whatever the other
//! parameters look like.

use crate::assets::{self, AssetInfo, Route};
use crate::chains::bitcoin::BitcoinTransfer;
use crate::chains::evm::{EvmNetwork, EvmTransfer};
use crate::chains::solana::SolanaTransfer;
use crate::chains::{ChainContext, ChainTransfer};
use crate::error::{EngineError, EngineResult};
use crate::types::{Asset, Chain, TransferRequest, TransferResult, ValidationResult};
use crate::utils::units::parse_decimal;
use crate::{log_info, log_warn};

/// Network-free check of a transfer request.
///
/// Each failed check has its own reason.
pub fn validate_transfer_params(request: &TransferRequest) -> ValidationResult {
    let Some(asset) = request.asset.as_ref() else {
        return ValidationResult::invalid("Asset is required");
    };
    if request.from_address.trim().is_empty() {
        return ValidationResult::invalid("Sender address is required");
    }
    if request.to_address.trim().is_empty() {
        return ValidationResult::invalid("Recipient address is required");
    }

    let amount = match parse_decimal(&request.amount) {
        Ok(amount) if amount.is_finite() => amount,
        _ => return ValidationResult::invalid(format!("Invalid amount: {}", request.amount.trim())),
    };
    if amount <= 0.0 {
        return ValidationResult::invalid("Amount must be greater than zero");
    }
    if amount > asset.balance {
        return ValidationResult::invalid(format!(
            "Amount {} exceeds available balance {} {}",
            request.amount.trim(),
            asset.balance,
            asset.symbol
        ));
    }

    if request.private_key.is_empty() {
        return ValidationResult::invalid("Private key is required");
    }
    ValidationResult::valid()
}

fn network_for(chain: Chain) -> EngineResult<EvmNetwork> {
    EvmNetwork::from_chain(chain)
        .ok_or_else(|| EngineError::internal(format!("{} is not an EVM chain", chain)))
}

/// Registry entry for the request's asset
pub fn resolve(asset: &Asset) -> EngineResult<&'static AssetInfo> {
    assets::lookup(&asset.id)
        .ok_or_else(|| EngineError::unsupported_asset(format!("Unsupported asset: {}", asset.id)))
}

pub struct Dispatcher {
    ctx: ChainContext,
}

impl Dispatcher {
    pub fn new(ctx: ChainContext) -> Self {
        Self { ctx }
    }

    /// Transfer module for a registry entry. Recognized chains without a
    /// module fail here with `NotImplemented`.
    fn module_for(&self, info: &AssetInfo, asset: &Asset) -> EngineResult<Box<dyn ChainTransfer>> {
        let ctx = self.ctx.clone();
        let module: Box<dyn ChainTransfer> = match info.route() {
            Route::Bitcoin => Box::new(BitcoinTransfer::new(ctx)),
            Route::EvmNative(chain) => Box::new(EvmTransfer::native(ctx, network_for(chain)?)),
            Route::EvmToken { chain, contract } => Box::new(EvmTransfer::token(
                ctx,
                network_for(chain)?,
                contract,
                info.symbol,
                info.decimals_for(asset),
            )?),
            Route::Solana => Box::new(SolanaTransfer::new(ctx)),
            Route::Unimplemented(chain) => {
                return Err(EngineError::not_implemented(format!(
                    "{} transfer not implemented yet",
                    chain.display_name()
                )))
            }
        };
        Ok(module)
    }

    pub async fn transfer_asset(&self, request: &TransferRequest) -> TransferResult {
        let Some(asset) = request.asset.as_ref() else {
            return TransferResult::failed(EngineError::invalid_input("Asset is required"));
        };

        let routed = resolve(asset).and_then(|info| Ok((info, self.module_for(info, asset)?)));
        let (info, module) = match routed {
            Ok(routed) => routed,
            Err(e) => {
                log_warn!("dispatcher", "Transfer not routed", asset = asset.id, error = e);
                return TransferResult::failed(e);
            }
        };

        let validation = validate_transfer_params(request);
        if !validation.valid {
            let reason = validation.error.unwrap_or_else(|| "Invalid transfer".to_string());
            return TransferResult::failed(EngineError::invalid_input(reason));
        }

        log_info!(
            "dispatcher",
            "Dispatching transfer",
            asset = info.id,
            chain = info.chain,
            from = request.from_address,
            to = request.to_address,
            amount = request.amount
        );
        let result = module.transfer(&request.params()).await;
        if !result.success {
            log_warn!(
                "dispatcher",
                "Transfer failed",
                asset = info.id,
                error = result.error.as_deref().unwrap_or_default()
            );
        }
        result
    }
}
