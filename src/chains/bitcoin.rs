//! Bitcoin native SegWit (P2WPKH) transfers
//!
//! Transactions are assembled byte by byte: first-fit coin selection over
//! the sender's UTXOs, one recipient output plus optional change, BIP143
//! sighash per input, low-S DER signatures and a witness serialization.
//!
//! The fee is a fixed 10 sat/vB over an assumed 140 vB transaction. It
//! overpays for a single input and underpays once several inputs are
//! selected; a size-based estimate is the obvious next step.

use ::bitcoin::secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use async_trait::async_trait;

use super::{ChainContext, ChainTransfer};
use crate::codec::address::{decode_segwit, encode_p2wpkh, BITCOIN_HRP};
use crate::codec::bytes::{
    txid_from_hex, txid_to_hex, write_u32_le, write_u64_le, write_var_bytes, write_varint,
};
use crate::codec::der;
use crate::codec::hash::{hash160, sha256d};
use crate::codec::script::{p2pkh_script_code, p2wpkh_script, witness_program_script};
use crate::codec::CodecError;
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::rpc::esplora::EsploraClient;
use crate::types::{Chain, TransferParams, TransferResult, Utxo};
use crate::utils::units::to_base_units;
use crate::{log_info, log_warn};

// =============================================================================
// Constants
// =============================================================================

pub const FEE_RATE_SAT_PER_VBYTE: u64 = 10;
pub const ASSUMED_VSIZE: u64 = 140;
pub const FIXED_FEE_SATS: u64 = FEE_RATE_SAT_PER_VBYTE * ASSUMED_VSIZE;
/// Change at or below this is added to the fee instead of creating an output
pub const DUST_THRESHOLD_SATS: u64 = 546;
pub const BTC_DECIMALS: u8 = 8;

const TX_VERSION: u32 = 2;
const SEQUENCE_FINAL: u32 = 0xffff_ffff;
const LOCKTIME: u32 = 0;
const SIGHASH_ALL: u8 = 0x01;
const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;

// =============================================================================
// Transaction model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Previous txid in internal (little-endian) byte order
    pub txid: [u8; 32],
    pub vout: u32,
    /// Value of the spent output, committed to by BIP143
    pub value: u64,
    pub sequence: u32,
    /// BIP143 scriptCode, without length prefix
    pub script_code: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u32,
}

impl UnsignedTransaction {
    fn hash_prevouts(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(self.inputs.len() * 36);
        for input in &self.inputs {
            buf.extend_from_slice(&input.txid);
            write_u32_le(&mut buf, input.vout);
        }
        sha256d(&buf)
    }

    fn hash_sequence(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(self.inputs.len() * 4);
        for input in &self.inputs {
            write_u32_le(&mut buf, input.sequence);
        }
        sha256d(&buf)
    }

    fn write_outputs(&self, buf: &mut Vec<u8>) {
        for output in &self.outputs {
            write_u64_le(buf, output.value);
            write_var_bytes(buf, &output.script_pubkey);
        }
    }

    fn hash_outputs(&self) -> [u8; 32] {
        let mut buf = Vec::new();
        self.write_outputs(&mut buf);
        sha256d(&buf)
    }

    /// BIP143 signature message for input `index` with SIGHASH_ALL
    pub fn bip143_preimage(&self, index: usize) -> Result<Vec<u8>, CodecError> {
        let input = self.inputs.get(index).ok_or(CodecError::InputIndexOutOfRange {
            index,
            count: self.inputs.len(),
        })?;

        let mut buf = Vec::with_capacity(156 + input.script_code.len());
        write_u32_le(&mut buf, self.version);
        buf.extend_from_slice(&self.hash_prevouts());
        buf.extend_from_slice(&self.hash_sequence());
        buf.extend_from_slice(&input.txid);
        write_u32_le(&mut buf, input.vout);
        write_var_bytes(&mut buf, &input.script_code);
        write_u64_le(&mut buf, input.value);
        write_u32_le(&mut buf, input.sequence);
        buf.extend_from_slice(&self.hash_outputs());
        write_u32_le(&mut buf, self.locktime);
        write_u32_le(&mut buf, SIGHASH_ALL as u32);
        Ok(buf)
    }

    pub fn sighash(&self, index: usize) -> Result<[u8; 32], CodecError> {
        Ok(sha256d(&self.bip143_preimage(index)?))
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        write_varint(buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(&input.txid);
            write_u32_le(buf, input.vout);
            // scriptSig stays empty for native segwit
            write_varint(buf, 0);
            write_u32_le(buf, input.sequence);
        }
        write_varint(buf, self.outputs.len() as u64);
        self.write_outputs(buf);
    }

    /// Serialization without witness data; its SHA-256d is the txid.
    pub fn serialize_legacy(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, self.version);
        self.write_body(&mut buf);
        write_u32_le(&mut buf, self.locktime);
        buf
    }

    pub fn txid(&self) -> String {
        txid_to_hex(&sha256d(&self.serialize_legacy()))
    }

    /// Full segwit serialization with one witness stack per input
    pub fn serialize_with_witnesses(&self, witnesses: &[Vec<Vec<u8>>]) -> Result<Vec<u8>, CodecError> {
        if witnesses.len() != self.inputs.len() {
            return Err(CodecError::InputIndexOutOfRange {
                index: witnesses.len(),
                count: self.inputs.len(),
            });
        }

        let mut buf = Vec::new();
        write_u32_le(&mut buf, self.version);
        buf.push(SEGWIT_MARKER);
        buf.push(SEGWIT_FLAG);
        self.write_body(&mut buf);
        for stack in witnesses {
            write_varint(&mut buf, stack.len() as u64);
            for item in stack {
                write_var_bytes(&mut buf, item);
            }
        }
        write_u32_le(&mut buf, self.locktime);
        Ok(buf)
    }
}

/// Signed, serialized transaction ready for `POST /tx`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hex: String,
    pub txid: String,
}

// =============================================================================
// Keys
// =============================================================================

/// Compressed secp256k1 key controlling a P2WPKH address
pub struct SigningKey {
    secret: SecretKey,
    public: PublicKey,
}

impl SigningKey {
    /// 64 hex characters (optional `0x`) or a compressed mainnet WIF
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let raw = raw.trim();
        let hex_part = raw.strip_prefix("0x").unwrap_or(raw);

        let secret = if hex_part.len() == 64 && hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
            let bytes = hex::decode(hex_part)?;
            SecretKey::from_slice(&bytes)
                .map_err(|_| EngineError::invalid_private_key("Private key is out of range"))?
        } else {
            let wif = ::bitcoin::PrivateKey::from_wif(raw).map_err(|_| {
                EngineError::invalid_private_key(
                    "Invalid Bitcoin private key: expected 64 hex characters or WIF",
                )
            })?;
            if !wif.compressed {
                return Err(EngineError::invalid_private_key(
                    "Uncompressed WIF keys cannot spend P2WPKH outputs",
                ));
            }
            if wif.network != ::bitcoin::NetworkKind::Main {
                return Err(EngineError::invalid_private_key("WIF key is not for mainnet"));
            }
            wif.inner
        };

        let secp = Secp256k1::signing_only();
        let public = PublicKey::from_secret_key(&secp, &secret);
        Ok(Self { secret, public })
    }

    pub fn public_key(&self) -> [u8; 33] {
        self.public.serialize()
    }

    pub fn pubkey_hash(&self) -> [u8; 20] {
        hash160(&self.public_key())
    }

    pub fn address(&self) -> EngineResult<String> {
        Ok(encode_p2wpkh(BITCOIN_HRP, &self.pubkey_hash())?)
    }

    /// DER signature (low-S) with the SIGHASH_ALL byte appended
    pub fn sign_digest(&self, digest: [u8; 32]) -> Vec<u8> {
        let secp = Secp256k1::signing_only();
        let signature = secp.sign_ecdsa(&Message::from_digest(digest), &self.secret);
        let mut der = der::encode_compact(&signature.serialize_compact());
        der.push(SIGHASH_ALL);
        der
    }
}

// =============================================================================
// Planning and signing
// =============================================================================

/// Inputs and outputs chosen for a spend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendPlan {
    pub selected: Vec<Utxo>,
    pub amount: u64,
    pub fee: u64,
    /// Change output value; zero when there is no change output
    pub change: u64,
    /// Sub-dust change given up to the miner
    pub forfeited: u64,
}

/// First-fit selection in the order the UTXOs were returned.
pub fn plan_spend(utxos: &[Utxo], amount: u64, fee: u64) -> EngineResult<SpendPlan> {
    if utxos.is_empty() {
        return Err(EngineError::new(ErrorCode::NoUtxos, "No spendable outputs for sender"));
    }

    let target = amount
        .checked_add(fee)
        .ok_or_else(|| EngineError::invalid_input("Amount too large"))?;
    let available = utxos
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.value))
        .ok_or_else(|| EngineError::parse_error("UTXO values out of range"))?;
    if available < target {
        return Err(EngineError::insufficient_funds(format!(
            "Insufficient funds: available {} sats, required {} sats (amount {} + fee {})",
            available, target, amount, fee
        )));
    }

    let mut selected = Vec::new();
    let mut total = 0u64;
    for utxo in utxos {
        selected.push(utxo.clone());
        total = total
            .checked_add(utxo.value)
            .ok_or_else(|| EngineError::parse_error("UTXO values out of range"))?;
        if total >= target {
            break;
        }
    }

    let leftover = total - target;
    let (change, forfeited) = if leftover > DUST_THRESHOLD_SATS {
        (leftover, 0)
    } else {
        (0, leftover)
    };

    Ok(SpendPlan {
        selected,
        amount,
        fee,
        change,
        forfeited,
    })
}

/// Output script for a `bc1…` destination of any witness version.
pub fn recipient_script(address: &str) -> EngineResult<Vec<u8>> {
    if !address.to_ascii_lowercase().starts_with("bc1") {
        return Err(EngineError::invalid_address(format!(
            "Only native SegWit (bc1…) recipients are supported: {}",
            address
        )));
    }
    let program = decode_segwit(BITCOIN_HRP, address)?;
    Ok(witness_program_script(program.version, &program.program)?)
}

pub fn build_transaction(
    plan: &SpendPlan,
    recipient_script: Vec<u8>,
    sender_hash: &[u8; 20],
) -> EngineResult<UnsignedTransaction> {
    let script_code = p2pkh_script_code(sender_hash);
    let inputs = plan
        .selected
        .iter()
        .map(|utxo| {
            Ok(TxInput {
                txid: txid_from_hex(&utxo.txid)?,
                vout: utxo.vout,
                value: utxo.value,
                sequence: SEQUENCE_FINAL,
                script_code: script_code.clone(),
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    let mut outputs = vec![TxOutput {
        value: plan.amount,
        script_pubkey: recipient_script,
    }];
    if plan.change > 0 {
        outputs.push(TxOutput {
            value: plan.change,
            script_pubkey: p2wpkh_script(sender_hash),
        });
    }

    Ok(UnsignedTransaction {
        version: TX_VERSION,
        inputs,
        outputs,
        locktime: LOCKTIME,
    })
}

pub fn sign_transaction(tx: &UnsignedTransaction, key: &SigningKey) -> EngineResult<SignedTransaction> {
    let public_key = key.public_key().to_vec();
    let witnesses = (0..tx.inputs.len())
        .map(|index| {
            let digest = tx.sighash(index)?;
            Ok(vec![key.sign_digest(digest), public_key.clone()])
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    let raw = tx.serialize_with_witnesses(&witnesses)?;
    Ok(SignedTransaction {
        hex: hex::encode(raw),
        txid: tx.txid(),
    })
}

// =============================================================================
// Transfer module
// =============================================================================

pub struct BitcoinTransfer {
    ctx: ChainContext,
}

impl BitcoinTransfer {
    pub fn new(ctx: ChainContext) -> Self {
        Self { ctx }
    }

    async fn execute(&self, params: &TransferParams<'_>) -> EngineResult<String> {
        let recipient = recipient_script(params.to_address)?;

        let sats = to_base_units(params.amount, BTC_DECIMALS)?;
        let sats = u64::try_from(sats).map_err(|_| EngineError::invalid_input("Amount too large"))?;
        if sats == 0 {
            return Err(EngineError::invalid_input("Amount must be at least 1 satoshi"));
        }

        let key = SigningKey::parse(params.private_key.expose())?;
        let derived = key.address()?;
        if !derived.eq_ignore_ascii_case(params.from_address) {
            return Err(EngineError::key_mismatch(
                "Private key does not match the sender address",
            ));
        }

        let esplora = EsploraClient::new(self.ctx.connect(Chain::Bitcoin).await?);
        let utxos = esplora.utxos(&derived).await?;
        let plan = plan_spend(&utxos, sats, FIXED_FEE_SATS)?;
        let unsigned = build_transaction(&plan, recipient, &key.pubkey_hash())?;
        let signed = sign_transaction(&unsigned, &key)?;

        log_info!(
            "chains::bitcoin",
            "Broadcasting transaction",
            txid = signed.txid,
            inputs = plan.selected.len(),
            fee = plan.fee + plan.forfeited,
            endpoint = esplora.url()
        );
        let node_txid = esplora.broadcast(&signed.hex).await?;
        if !node_txid.is_empty() && node_txid != signed.txid {
            log_warn!(
                "chains::bitcoin",
                "Node reported a different txid",
                txid = signed.txid,
                node_txid = node_txid
            );
        }
        Ok(signed.txid)
    }
}

#[async_trait]
impl ChainTransfer for BitcoinTransfer {
    async fn transfer(&self, params: &TransferParams<'_>) -> TransferResult {
        self.execute(params).await.into()
    }
}
