//! Endpoint failover
//!
//! Candidates are probed strictly in order. The first endpoint that answers
//! its probe is bound into a [`Connection`]; later candidates are never
//! contacted. There is no ranking and no parallel probing.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::transport::{rpc_request, rpc_result, Transport};
use crate::error::{EngineError, EngineResult};
use crate::types::Chain;
use crate::{log_debug, log_warn};

/// Liveness check run against each candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// JSON-RPC call whose result must be non-null
    JsonRpc(&'static str),
    /// REST GET whose body must be a block height
    RestGet(&'static str),
}

impl Probe {
    pub fn for_chain(chain: Chain) -> Probe {
        match chain {
            Chain::Bitcoin => Probe::RestGet("/blocks/tip/height"),
            Chain::Solana => Probe::JsonRpc("getVersion"),
            _ => Probe::JsonRpc("eth_blockNumber"),
        }
    }
}

/// A live endpoint plus the timeout for requests made through it
#[derive(Clone)]
pub struct Connection {
    url: String,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Connection {
    pub fn new(url: impl Into<String>, transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            transport,
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn join(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }

    pub async fn rpc(&self, method: &str, params: Value) -> EngineResult<Value> {
        let response = self
            .transport
            .post_json(&self.url, &rpc_request(method, params), self.timeout)
            .await?;
        rpc_result(method, response)
    }

    /// JSON-RPC call decoded into `T`; a null result is an error.
    pub async fn rpc_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> EngineResult<T> {
        let result = self.rpc(method, params).await?;
        if result.is_null() {
            return Err(EngineError::rpc_error(format!("{}: null result", method)));
        }
        serde_json::from_value(result)
            .map_err(|e| EngineError::parse_error(format!("{}: unexpected result: {}", method, e)))
    }

    pub async fn get_text(&self, path: &str) -> EngineResult<String> {
        self.transport.get_text(&self.join(path), self.timeout).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> EngineResult<T> {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body)
            .map_err(|e| EngineError::parse_error(format!("GET {}: unexpected body: {}", path, e)))
    }

    pub async fn post_text(&self, path: &str, body: String) -> EngineResult<String> {
        self.transport
            .post_text(&self.join(path), body, self.timeout)
            .await
    }
}

#[derive(Clone)]
pub struct EndpointSelector {
    transport: Arc<dyn Transport>,
    probe_timeout: Duration,
    request_timeout: Duration,
}

impl EndpointSelector {
    pub fn new(transport: Arc<dyn Transport>, probe_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            transport,
            probe_timeout,
            request_timeout,
        }
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// First endpoint that passes `probe`, or `NetworkUnreachable` listing
    /// why each candidate failed.
    pub async fn acquire(&self, chain: Chain, endpoints: &[String], probe: Probe) -> EngineResult<Connection> {
        let mut failures = Vec::with_capacity(endpoints.len());

        for endpoint in endpoints {
            match self.probe(endpoint, probe).await {
                Ok(()) => {
                    log_debug!("rpc::selector", "Endpoint live", chain = chain, url = endpoint);
                    return Ok(Connection::new(
                        endpoint.clone(),
                        Arc::clone(&self.transport),
                        self.request_timeout,
                    ));
                }
                Err(e) => {
                    log_warn!(
                        "rpc::selector",
                        "Endpoint probe failed",
                        chain = chain,
                        url = endpoint,
                        reason = e.message
                    );
                    failures.push(format!("{}: {}", endpoint, e.message));
                }
            }
        }

        let details = if failures.is_empty() {
            "no endpoints configured".to_string()
        } else {
            failures.join("; ")
        };
        Err(EngineError::network_unreachable(format!("No reachable {} endpoint", chain))
            .with_details(details))
    }

    async fn probe(&self, endpoint: &str, probe: Probe) -> EngineResult<()> {
        match probe {
            Probe::JsonRpc(method) => {
                let response = self
                    .transport
                    .post_json(endpoint, &rpc_request(method, Value::Array(vec![])), self.probe_timeout)
                    .await?;
                let result = rpc_result(method, response)?;
                if result.is_null() {
                    return Err(EngineError::rpc_error(format!("{} returned null", method)));
                }
                Ok(())
            }
            Probe::RestGet(path) => {
                let url = format!("{}{}", endpoint.trim_end_matches('/'), path);
                let body = self.transport.get_text(&url, self.probe_timeout).await?;
                body.trim().parse::<u64>().map(|_| ()).map_err(|_| {
                    EngineError::parse_error(format!("{} did not return a block height", path))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::rpc::mock::MockTransport;
    use serde_json::json;

    fn selector(mock: &Arc<MockTransport>) -> EndpointSelector {
        EndpointSelector::new(mock.clone(), Duration::from_millis(100), Duration::from_millis(500))
    }

    fn list(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_live_endpoint_wins_and_later_untouched() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_rpc("https://dead1", "eth_blockNumber", EngineError::network_error("refused"));
        mock.on_rpc_error("https://dead2", "eth_blockNumber", -32603, "internal");
        mock.on_rpc("https://live", "eth_blockNumber", json!("0x1234"));
        mock.on_rpc("https://extra", "eth_blockNumber", json!("0x1234"));

        let endpoints = list(&["https://dead1", "https://dead2", "https://live", "https://extra"]);
        let conn = selector(&mock)
            .acquire(Chain::Ethereum, &endpoints, Probe::for_chain(Chain::Ethereum))
            .await
            .unwrap();

        assert_eq!(conn.url(), "https://live");
        assert_eq!(mock.calls_to("https://extra"), 0);
        assert_eq!(mock.calls_to("https://dead1"), 1);
    }

    #[tokio::test]
    async fn test_null_result_and_timeouts_are_failures() {
        let mock = Arc::new(MockTransport::new());
        mock.on_rpc("https://null", "getVersion", Value::Null);
        mock.on_rpc_delayed("https://slow", "getVersion", json!({"solana-core": "1.18"}), Duration::from_millis(400));

        let err = selector(&mock)
            .acquire(Chain::Solana, &list(&["https://null", "https://slow"]), Probe::JsonRpc("getVersion"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::NetworkUnreachable);
        let details = err.details.unwrap();
        assert!(details.contains("https://null: getVersion returned null"));
        assert!(details.contains("https://slow:"));
    }

    #[tokio::test]
    async fn test_rest_probe_requires_height() {
        let mock = Arc::new(MockTransport::new());
        mock.on_get("https://bad/blocks/tip/height", "<html>maintenance</html>");
        mock.on_get("https://good/api/blocks/tip/height", "840000\n");

        let conn = selector(&mock)
            .acquire(Chain::Bitcoin, &list(&["https://bad", "https://good/api/"]), Probe::for_chain(Chain::Bitcoin))
            .await
            .unwrap();
        assert_eq!(conn.url(), "https://good/api/");
    }

    #[tokio::test]
    async fn test_empty_list_is_unreachable() {
        let mock = Arc::new(MockTransport::new());
        let err = selector(&mock)
            .acquire(Chain::Bsc, &[], Probe::JsonRpc("eth_blockNumber"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NetworkUnreachable);
        assert_eq!(err.details.as_deref(), Some("no endpoints configured"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_connection_requests_use_request_timeout() {
        let mock = Arc::new(MockTransport::new());
        mock.on_rpc("https://rpc", "eth_blockNumber", json!("0x1"));
        mock.on_rpc_delayed("https://rpc", "eth_gasPrice", json!("0x3b9aca00"), Duration::from_millis(200));

        let conn = selector(&mock)
            .acquire(Chain::Bsc, &list(&["https://rpc"]), Probe::JsonRpc("eth_blockNumber"))
            .await
            .unwrap();
        // 200 ms exceeds the probe timeout but not the request timeout
        let price: String = conn.rpc_as("eth_gasPrice", json!([])).await.unwrap();
        assert_eq!(price, "0x3b9aca00");
    }
}
