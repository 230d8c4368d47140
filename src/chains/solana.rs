//! Solana native SOL transfers
//!
//! A single system-program transfer with the sender as fee payer. After
//! `sendTransaction` the signature is polled until the cluster reports it
//! confirmed, reports an error, or the confirmation window closes.

#![allow(deprecated)]

use async_trait::async_trait;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::str::FromStr;
use tokio::time::{sleep, Instant};

use super::{ChainContext, ChainTransfer};
use crate::error::{EngineError, EngineResult};
use crate::rpc::solana::SolanaRpc;
use crate::types::{Chain, TransferParams, TransferResult};
use crate::utils::units::to_base_units;
use crate::{log_info, log_warn};

pub const LAMPORTS_DECIMALS: u8 = 9;
const KEYPAIR_LEN: usize = 64;

/// Decode a 64-byte keypair given as `0x` hex, bare hex or base58.
///
/// The trailing 32 bytes must be the public key of the leading seed.
pub fn keypair_from_secret(raw: &str) -> EngineResult<Keypair> {
    let raw = raw.trim();
    let bytes = if let Some(hex_part) = raw.strip_prefix("0x") {
        hex::decode(hex_part)?
    } else if raw.len() == KEYPAIR_LEN * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        hex::decode(raw)?
    } else {
        bs58::decode(raw).into_vec().map_err(|e| {
            EngineError::invalid_private_key(format!("Solana key is not hex or base58: {}", e))
        })?
    };

    if bytes.len() != KEYPAIR_LEN {
        return Err(EngineError::invalid_private_key(format!(
            "Solana keypair must be {} bytes, got {}",
            KEYPAIR_LEN,
            bytes.len()
        )));
    }

    let keypair = keypair_from_seed(&bytes[..32])
        .map_err(|e| EngineError::invalid_private_key(format!("Invalid Solana seed: {}", e)))?;
    if keypair.pubkey().to_bytes()[..] != bytes[32..] {
        return Err(EngineError::invalid_private_key(
            "Solana keypair public half does not match its seed",
        ));
    }
    Ok(keypair)
}

pub fn parse_pubkey(raw: &str, role: &str) -> EngineResult<Pubkey> {
    Pubkey::from_str(raw.trim())
        .map_err(|_| EngineError::invalid_address(format!("Invalid {} address: {}", role, raw)))
}

/// How the confirmation wait ended
#[derive(Debug, Clone, PartialEq)]
enum Confirmation {
    Confirmed,
    Failed(String),
    /// Timed out or polling failed; the transaction may still land
    Unknown(String),
}

pub struct SolanaTransfer {
    ctx: ChainContext,
}

impl SolanaTransfer {
    pub fn new(ctx: ChainContext) -> Self {
        Self { ctx }
    }

    async fn await_confirmation(&self, rpc: &SolanaRpc, signature: &str) -> Confirmation {
        let deadline = Instant::now() + self.ctx.config.confirmation_timeout();
        let poll = self.ctx.config.confirmation_poll_interval();
        loop {
            match rpc.signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(err) = status.err {
                        return Confirmation::Failed(err.to_string());
                    }
                    if status.is_confirmed() {
                        return Confirmation::Confirmed;
                    }
                }
                Ok(None) => {}
                Err(e) => return Confirmation::Unknown(e.message),
            }
            if Instant::now() + poll > deadline {
                return Confirmation::Unknown("confirmation timed out".to_string());
            }
            sleep(poll).await;
        }
    }

    async fn execute(&self, params: &TransferParams<'_>) -> EngineResult<TransferResult> {
        let recipient = parse_pubkey(params.to_address, "recipient")?;
        let lamports = u64::try_from(to_base_units(params.amount, LAMPORTS_DECIMALS)?)
            .map_err(|_| EngineError::invalid_input("Amount too large"))?;
        if lamports == 0 {
            return Err(EngineError::invalid_input("Amount must be greater than zero"));
        }

        let keypair = keypair_from_secret(params.private_key.expose())?;
        let sender = keypair.pubkey();
        if sender.to_string() != params.from_address {
            return Err(EngineError::key_mismatch(
                "Private key does not match the sender address",
            ));
        }

        let rpc = SolanaRpc::new(self.ctx.connect(Chain::Solana).await?);
        let balance = rpc.balance(&sender).await?;
        let blockhash = rpc.latest_blockhash().await?;

        let instruction = system_instruction::transfer(&sender, &recipient, lamports);
        let message = Message::new_with_blockhash(&[instruction], Some(&sender), &blockhash);
        let fee = rpc.fee_for_message(&message).await?;
        let rent_minimum = rpc.minimum_balance_for_rent_exemption(0).await?;

        let required = lamports
            .checked_add(fee)
            .and_then(|v| v.checked_add(rent_minimum))
            .ok_or_else(|| EngineError::invalid_input("Amount too large"))?;
        if balance < required {
            return Err(EngineError::insufficient_balance(format!(
                "Insufficient SOL balance: have {} lamports, need {} lamports \
                 (amount {} + fee {} + rent-exempt minimum {})",
                balance, required, lamports, fee, rent_minimum
            )));
        }

        let mut tx = Transaction::new_unsigned(message);
        tx.try_sign(&[&keypair], blockhash)
            .map_err(|e| EngineError::crypto_error(format!("Solana signing failed: {}", e)))?;

        let signature = rpc.send_transaction(&tx).await?;
        log_info!(
            "chains::solana",
            "Transaction submitted",
            tx_hash = signature,
            lamports = lamports,
            endpoint = rpc.url()
        );

        match self.await_confirmation(&rpc, &signature).await {
            Confirmation::Confirmed => {
                log_info!("chains::solana", "Transaction confirmed", tx_hash = signature);
                Ok(TransferResult::ok(signature))
            }
            Confirmation::Failed(err) => {
                log_warn!(
                    "chains::solana",
                    "Transaction failed on chain",
                    tx_hash = signature,
                    error = err
                );
                Ok(TransferResult::failed_on_chain(
                    signature,
                    EngineError::broadcast_failed(format!("Transaction failed: {}", err)),
                ))
            }
            Confirmation::Unknown(reason) => {
                log_warn!(
                    "chains::solana",
                    "Confirmation not observed",
                    tx_hash = signature,
                    reason = reason
                );
                Ok(TransferResult::ok(signature))
            }
        }
    }
}

#[async_trait]
impl ChainTransfer for SolanaTransfer {
    async fn transfer(&self, params: &TransferParams<'_>) -> TransferResult {
        self.execute(params)
            .await
            .unwrap_or_else(TransferResult::failed)
    }
}
