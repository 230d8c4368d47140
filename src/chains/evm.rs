//! EVM transfers for Ethereum (chain id 1) and BSC (chain id 56)
//!
//! Native coin and ERC-20 transfers share one path: resolve fee fields,
//! check the sender can pay, sign with EIP-155 replay protection and
//! submit with `eth_sendRawTransaction`. Ethereum uses EIP-1559 fee
//! fields; BSC uses legacy `gasPrice` transactions.

use async_trait::async_trait;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Bytes, Eip1559TransactionRequest, TransactionRequest, U256};
use ethers_core::utils::format_units;
use ethers_signers::{LocalWallet, Signer};
use std::str::FromStr;

use super::erc20::{transfer_call, Erc20};
use super::{ChainContext, ChainTransfer};
use crate::error::{EngineError, EngineResult};
use crate::rpc::evm::EvmRpc;
use crate::types::{Chain, TransferParams, TransferResult};
use crate::utils::units::to_base_units;
use crate::{log_debug, log_info};

pub const NATIVE_GAS_LIMIT: u64 = 21_000;
/// Added on top of `eth_estimateGas` for token transfers
pub const GAS_BUFFER_PERCENT: u64 = 20;
pub const DEFAULT_PRIORITY_FEE_WEI: u64 = 1_500_000_000;
const FEE_HISTORY_BLOCKS: u64 = 5;
const FEE_HISTORY_PERCENTILE: f64 = 50.0;
const NATIVE_DECIMALS: u8 = 18;

/// The two supported EVM networks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmNetwork {
    Ethereum,
    Bsc,
}

impl EvmNetwork {
    pub fn from_chain(chain: Chain) -> Option<Self> {
        match chain {
            Chain::Ethereum => Some(EvmNetwork::Ethereum),
            Chain::Bsc => Some(EvmNetwork::Bsc),
            _ => None,
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            EvmNetwork::Ethereum => Chain::Ethereum,
            EvmNetwork::Bsc => Chain::Bsc,
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            EvmNetwork::Ethereum => 1,
            EvmNetwork::Bsc => 56,
        }
    }

    pub fn uses_eip1559(&self) -> bool {
        matches!(self, EvmNetwork::Ethereum)
    }

    pub fn native_symbol(&self) -> &'static str {
        self.chain().symbol()
    }
}

/// Fee fields for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeParams {
    Eip1559 { max_fee: U256, priority_fee: U256 },
    Legacy { gas_price: U256 },
}

impl FeeParams {
    /// Worst-case price per gas unit
    pub fn max_price(&self) -> U256 {
        match self {
            FeeParams::Eip1559 { max_fee, .. } => *max_fee,
            FeeParams::Legacy { gas_price } => *gas_price,
        }
    }
}

/// EIP-1559 fee from a projected base fee: `2 * base + priority`.
pub fn eip1559_fees(next_base_fee: U256, priority_fee: Option<U256>) -> EngineResult<FeeParams> {
    let priority_fee = priority_fee.unwrap_or_else(|| U256::from(DEFAULT_PRIORITY_FEE_WEI));
    let max_fee = next_base_fee
        .checked_mul(U256::from(2))
        .and_then(|double| double.checked_add(priority_fee))
        .ok_or_else(|| out_of_range("fee per gas"))?;
    Ok(FeeParams::Eip1559 {
        max_fee,
        priority_fee,
    })
}

pub fn buffered_gas(estimate: U256) -> EngineResult<U256> {
    estimate
        .checked_mul(U256::from(100 + GAS_BUFFER_PERCENT))
        .map(|gas| gas / 100)
        .ok_or_else(|| out_of_range("gas estimate"))
}

/// Worst-case fee for a gas limit at a price per gas
fn max_fee_for(gas_limit: U256, price: U256) -> EngineResult<U256> {
    gas_limit
        .checked_mul(price)
        .ok_or_else(|| out_of_range("transaction fee"))
}

fn out_of_range(what: &str) -> EngineError {
    EngineError::rpc_error(format!("Node returned a {} out of range", what))
}

#[derive(Debug, Clone)]
enum TransferKind {
    Native,
    Token {
        contract: Address,
        symbol: String,
        decimals: u8,
    },
}

/// Decode a 32-byte hex private key into a chain-bound wallet.
pub fn wallet_from_key(raw: &str, chain_id: u64) -> EngineResult<LocalWallet> {
    let raw = raw.trim();
    let hex_part = raw.strip_prefix("0x").unwrap_or(raw);
    if hex_part.len() != 64 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EngineError::invalid_private_key(
            "EVM private key must be 32 bytes of hex",
        ));
    }
    let bytes = hex::decode(hex_part)?;
    let wallet = LocalWallet::from_bytes(&bytes)
        .map_err(|e| EngineError::invalid_private_key(format!("Invalid EVM private key: {}", e)))?;
    Ok(wallet.with_chain_id(chain_id))
}

pub fn parse_address(raw: &str, role: &str) -> EngineResult<Address> {
    let raw = raw.trim();
    let hex_part = raw.strip_prefix("0x").unwrap_or(raw);
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EngineError::invalid_address(format!(
            "Invalid {} address: {}",
            role, raw
        )));
    }
    Address::from_str(hex_part)
        .map_err(|e| EngineError::invalid_address(format!("Invalid {} address: {}", role, e)))
}

fn display(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals as u32).unwrap_or_else(|_| amount.to_string())
}

pub struct EvmTransfer {
    ctx: ChainContext,
    network: EvmNetwork,
    kind: TransferKind,
}

impl EvmTransfer {
    pub fn native(ctx: ChainContext, network: EvmNetwork) -> Self {
        Self {
            ctx,
            network,
            kind: TransferKind::Native,
        }
    }

    pub fn token(
        ctx: ChainContext,
        network: EvmNetwork,
        contract: &str,
        symbol: &str,
        decimals: u8,
    ) -> EngineResult<Self> {
        let contract = parse_address(contract, "token contract")
            .map_err(|e| EngineError::internal(e.message))?;
        Ok(Self {
            ctx,
            network,
            kind: TransferKind::Token {
                contract,
                symbol: symbol.to_string(),
                decimals,
            },
        })
    }

    fn decimals(&self) -> u8 {
        match &self.kind {
            TransferKind::Native => NATIVE_DECIMALS,
            TransferKind::Token { decimals, .. } => *decimals,
        }
    }

    async fn fee_params(&self, rpc: &EvmRpc) -> EngineResult<FeeParams> {
        if self.network.uses_eip1559() {
            let history = rpc
                .fee_history(FEE_HISTORY_BLOCKS, FEE_HISTORY_PERCENTILE)
                .await?;
            let base = history
                .next_base_fee()
                .ok_or_else(|| EngineError::rpc_error("eth_feeHistory returned no base fee"))?;
            eip1559_fees(base, history.median_reward())
        } else {
            Ok(FeeParams::Legacy {
                gas_price: rpc.gas_price().await?,
            })
        }
    }

    fn insufficient_native(&self, balance: U256, needed: U256, detail: String) -> EngineError {
        let symbol = self.network.native_symbol();
        EngineError::insufficient_balance(format!(
            "Insufficient {} balance: have {}, need {} ({})",
            symbol,
            display(balance, NATIVE_DECIMALS),
            display(needed, NATIVE_DECIMALS),
            detail
        ))
    }

    async fn execute(&self, params: &TransferParams<'_>) -> EngineResult<String> {
        let to = parse_address(params.to_address, "recipient")?;
        let from = parse_address(params.from_address, "sender")?;

        let amount = U256::from(to_base_units(params.amount, self.decimals())?);
        if amount.is_zero() {
            return Err(EngineError::invalid_input("Amount must be greater than zero"));
        }

        let wallet = wallet_from_key(params.private_key.expose(), self.network.chain_id())?;
        if wallet.address() != from {
            return Err(EngineError::key_mismatch(
                "Private key does not match the sender address",
            ));
        }

        let rpc = EvmRpc::new(self.ctx.connect(self.network.chain()).await?);
        let nonce = rpc.pending_nonce(from).await?;
        let fees = self.fee_params(&rpc).await?;
        let max_price = fees.max_price();

        let (tx_to, value, data, gas_limit) = match &self.kind {
            TransferKind::Native => {
                let gas_limit = U256::from(NATIVE_GAS_LIMIT);
                let max_fee = max_fee_for(gas_limit, max_price)?;
                let needed = amount
                    .checked_add(max_fee)
                    .ok_or_else(|| out_of_range("transaction fee"))?;
                let balance = rpc.balance(from).await?;
                if needed > balance {
                    return Err(self.insufficient_native(
                        balance,
                        needed,
                        format!(
                            "amount {} + max fee {}",
                            display(amount, NATIVE_DECIMALS),
                            display(max_fee, NATIVE_DECIMALS)
                        ),
                    ));
                }
                (to, amount, Bytes::default(), gas_limit)
            }
            TransferKind::Token {
                contract,
                symbol,
                decimals,
            } => {
                let token_balance = Erc20::new(&rpc, *contract).balance_of(from).await?;
                if token_balance < amount {
                    return Err(EngineError::insufficient_balance(format!(
                        "Insufficient {} balance: have {}, need {}",
                        symbol,
                        display(token_balance, *decimals),
                        display(amount, *decimals)
                    )));
                }

                let data = transfer_call(to, amount);
                let estimate = rpc.estimate_gas(from, *contract, &data).await?;
                let gas_limit = buffered_gas(estimate)?;
                let max_fee = max_fee_for(gas_limit, max_price)?;
                let balance = rpc.balance(from).await?;
                if max_fee > balance {
                    return Err(self.insufficient_native(
                        balance,
                        max_fee,
                        format!("gas for {} transfer", symbol),
                    ));
                }
                (*contract, U256::zero(), data, gas_limit)
            }
        };

        let chain_id = self.network.chain_id();
        let tx: TypedTransaction = match fees {
            FeeParams::Eip1559 {
                max_fee,
                priority_fee,
            } => Eip1559TransactionRequest::new()
                .from(from)
                .to(tx_to)
                .value(value)
                .data(data)
                .gas(gas_limit)
                .max_fee_per_gas(max_fee)
                .max_priority_fee_per_gas(priority_fee)
                .nonce(nonce)
                .chain_id(chain_id)
                .into(),
            FeeParams::Legacy { gas_price } => TransactionRequest::new()
                .from(from)
                .to(tx_to)
                .value(value)
                .data(data)
                .gas(gas_limit)
                .gas_price(gas_price)
                .nonce(nonce)
                .chain_id(chain_id)
                .into(),
        };

        let signature = wallet.sign_transaction(&tx).await?;
        let raw = tx.rlp_signed(&signature);
        log_debug!(
            "chains::evm",
            "Signed transaction",
            chain = self.network.chain(),
            nonce = nonce,
            gas = gas_limit
        );

        let hash = rpc.send_raw_transaction(&raw).await?;
        log_info!(
            "chains::evm",
            "Transaction submitted",
            chain = self.network.chain(),
            tx_hash = hash,
            endpoint = rpc.url()
        );
        Ok(hash)
    }
}

#[async_trait]
impl ChainTransfer for EvmTransfer {
    async fn transfer(&self, params: &TransferParams<'_>) -> TransferResult {
        self.execute(params).await.into()
    }
}
