//! Transport seam
//!
//! Every request carries its own timeout; there is no client-wide default
//! that could let a call hang.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{EngineError, EngineResult, ErrorCode};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_text(&self, url: &str, timeout: Duration) -> EngineResult<String>;

    async fn post_text(&self, url: &str, body: String, timeout: Duration) -> EngineResult<String>;

    async fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> EngineResult<Value>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chain-transfer/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| EngineError::network_error(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn read_body(response: reqwest::Response) -> EngineResult<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EngineError::new(
                ErrorCode::HttpStatus,
                format!("HTTP {}", status.as_u16()),
            )
            .with_details(body.trim().to_string()));
        }
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str, timeout: Duration) -> EngineResult<String> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        Self::read_body(response).await
    }

    async fn post_text(&self, url: &str, body: String, timeout: Duration) -> EngineResult<String> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "text/plain")
            .body(body)
            .timeout(timeout)
            .send()
            .await?;
        Self::read_body(response).await
    }

    async fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> EngineResult<Value> {
        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await?;
        let text = Self::read_body(response).await?;
        serde_json::from_str(&text)
            .map_err(|e| EngineError::parse_error(format!("Invalid JSON response: {}", e)))
    }
}

/// JSON-RPC 2.0 request envelope
pub fn rpc_request(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    })
}

/// Extract `result` from a JSON-RPC response; an `error` member becomes
/// `RpcError` carrying the node's message.
pub fn rpc_result(method: &str, mut response: Value) -> EngineResult<Value> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        return Err(EngineError::rpc_error(format!("{}: {}", method, message))
            .with_details(format!("code {}", code)));
    }
    match response.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(EngineError::parse_error(format!(
            "{}: response has neither result nor error",
            method
        ))),
    }
}

/// A node answering a broadcast with a JSON-RPC error or a non-2xx status
/// rejected the transaction; both become `BroadcastFailed` with the node's
/// message. Other failures pass through.
pub fn broadcast_rejection(label: &str, error: EngineError) -> EngineError {
    match error.code {
        ErrorCode::RpcError => EngineError::broadcast_failed(error.message),
        ErrorCode::HttpStatus => {
            let node_message = error.details.clone().unwrap_or_else(|| error.message.clone());
            EngineError::broadcast_failed(format!("{} rejected: {}", label, node_message))
                .with_details(error.message)
        }
        _ => error,
    }
}
