use async_trait::async_trait;
use chain_transfer::rpc::Transport;
use chain_transfer::{
    validate_transfer_params, Asset, Chain, EngineConfig, EngineError, EngineResult, ErrorCode,
    FeeSource, TransferEngine, TransferRequest,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
const KEY_ONE_ADDRESS: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
const OTHER_ADDRESS: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

/// Transport with no network: every request fails and is counted.
#[derive(Default)]
struct OfflineTransport {
    requests: AtomicUsize,
}

impl OfflineTransport {
    fn fail(&self) -> EngineError {
        self.requests.fetch_add(1, Ordering::SeqCst);
        EngineError::network_error("Connection failed")
    }

    fn count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for OfflineTransport {
    async fn get_text(&self, _url: &str, _timeout: Duration) -> EngineResult<String> {
        Err(self.fail())
    }

    async fn post_text(&self, _url: &str, _body: String, _timeout: Duration) -> EngineResult<String> {
        Err(self.fail())
    }

    async fn post_json(&self, _url: &str, _body: &Value, _timeout: Duration) -> EngineResult<Value> {
        Err(self.fail())
    }
}

fn offline_engine() -> (TransferEngine, Arc<OfflineTransport>) {
    let transport = Arc::new(OfflineTransport::default());
    let engine = TransferEngine::with_transport(EngineConfig::default(), transport.clone()).unwrap();
    (engine, transport)
}

fn bitcoin(balance: f64) -> Asset {
    Asset::new("bitcoin", "BTC", "Bitcoin").with_balance(balance)
}

#[tokio::test]
async fn cardano_transfer_is_an_explicit_stub() {
    let (engine, transport) = offline_engine();
    let asset = Asset::new("cardano", "ADA", "Cardano").with_balance(100.0);
    let request = TransferRequest::new(asset, "addr1qfrom", "addr1qto", "10", "ed25519_sk1");

    let result = engine.transfer_asset(&request).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Cardano transfer not implemented yet"));
    assert_eq!(result.error_code, Some(ErrorCode::NotImplemented));
    assert!(result.tx_hash.is_none());
    assert_eq!(transport.count(), 0);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Cardano transfer not implemented yet");
}

#[tokio::test]
async fn every_stub_chain_names_itself() {
    let (engine, _) = offline_engine();
    for (id, expected) in [
        ("xrp", "XRP transfer not implemented yet"),
        ("DOGECOIN", "Dogecoin transfer not implemented yet"),
        ("trx", "Tron transfer not implemented yet"),
    ] {
        let request = TransferRequest::new(Asset::new(id, "", ""), "a", "b", "1", "k");
        let result = engine.transfer_asset(&request).await;
        assert_eq!(result.error.as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn unknown_asset_is_unsupported() {
    let (engine, transport) = offline_engine();
    let asset = Asset::new("litecoin", "LTC", "Litecoin").with_balance(5.0);
    let request = TransferRequest::new(asset, "ltc1from", "ltc1to", "1", "key");

    let result = engine.transfer_asset(&request).await;
    assert_eq!(result.error_code, Some(ErrorCode::UnsupportedAsset));
    assert_eq!(result.error.as_deref(), Some("Unsupported asset: litecoin"));
    assert_eq!(transport.count(), 0);
}

#[test]
fn validation_reasons_are_specific() {
    let valid = TransferRequest::new(bitcoin(0.5), KEY_ONE_ADDRESS, OTHER_ADDRESS, "0.001", KEY_ONE);
    assert!(validate_transfer_params(&valid).valid);

    let mut missing_asset = valid.clone();
    missing_asset.asset = None;
    let mut negative = valid.clone();
    negative.amount = "-1".to_string();
    let mut too_much = valid.clone();
    too_much.amount = "0.6".to_string();
    let mut no_key = valid.clone();
    no_key.private_key = "   ".into();

    let reasons: Vec<String> = [missing_asset, negative, too_much, no_key]
        .iter()
        .map(|req| validate_transfer_params(req).error.unwrap())
        .collect();
    assert_eq!(reasons[0], "Asset is required");
    assert_eq!(reasons[1], "Invalid amount: -1");
    assert_eq!(reasons[2], "Amount 0.6 exceeds available balance 0.5 BTC");
    assert_eq!(reasons[3], "Private key is required");
}

#[tokio::test]
async fn key_mismatch_makes_no_network_call() {
    let (engine, transport) = offline_engine();
    let request = TransferRequest::new(bitcoin(0.5), OTHER_ADDRESS, KEY_ONE_ADDRESS, "0.001", KEY_ONE);

    let result = engine.transfer_asset(&request).await;
    assert_eq!(result.error_code, Some(ErrorCode::KeyMismatch));
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn unreachable_network_is_reported() {
    let (engine, transport) = offline_engine();
    let request = TransferRequest::new(bitcoin(0.5), KEY_ONE_ADDRESS, OTHER_ADDRESS, "0.001", KEY_ONE);

    let result = engine.transfer_asset(&request).await;
    assert!(!result.success);
    assert_eq!(result.error_code, Some(ErrorCode::NetworkUnreachable));
    // one probe per configured Bitcoin endpoint, nothing else
    assert_eq!(transport.count(), engine.config().endpoints_for(Chain::Bitcoin).len());
}

#[tokio::test]
async fn fee_estimates_survive_an_outage() {
    let (engine, _) = offline_engine();

    let btc = engine.estimate_transfer_fee(&bitcoin(1.0), "0.001").await.unwrap();
    assert_eq!(btc.fee, 0.000014);
    assert_eq!(btc.source, FeeSource::Static);
    assert_eq!(btc.fee_usd, 0.000014 * 60_000.0);

    let eth = Asset::new("ethereum", "ETH", "Ethereum");
    let estimate = engine.estimate_transfer_fee(&eth, "0.1").await.unwrap();
    assert_eq!(estimate.source, FeeSource::Fallback);
    assert!(estimate.fee > 0.0);
    assert!(estimate.fee_usd > 0.0);
}

#[tokio::test]
async fn offline_balances_are_zero_but_present() {
    let (engine, _) = offline_engine();
    let mut addresses = BTreeMap::new();
    addresses.insert(Chain::Bitcoin, KEY_ONE_ADDRESS.to_string());
    addresses.insert(Chain::Bsc, "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".to_string());
    addresses.insert(Chain::Tron, "TQn9Y2khEsLJW1ChVWFMSMeRDow5KcbLSE".to_string());

    let balances = engine.fetch_all_balances(&addresses).await;
    let keys: Vec<&str> = balances.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["binancecoin", "bitcoin", "tron", "usdt"]);
    assert!(balances.values().all(|b| *b == 0.0));
}
