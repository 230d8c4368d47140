//! Scripted transport for tests
//!
//! Replies are queued per route. A route keeps returning its last reply
//! once the queue is down to one entry, so a single `on_rpc` answers any
//! number of calls.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::transport::Transport;
use crate::error::{EngineError, EngineResult, ErrorCode};

#[derive(Debug, Clone)]
enum Reply {
    Result(Value),
    RpcError(i64, String),
    Text(String),
    Fail(EngineError),
}

#[derive(Debug, Clone)]
struct Scripted {
    reply: Reply,
    delay: Duration,
}

/// One recorded request
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    /// JSON-RPC method, or `GET` / `POST` for REST calls
    pub method: String,
    pub body: Value,
}

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<Call>>,
}

fn rpc_key(url: &str, method: &str) -> String {
    format!("RPC {} {}", url, method)
}

fn rest_key(verb: &str, url: &str) -> String {
    format!("{} {}", verb, url)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, key: String, reply: Reply, delay: Duration) {
        self.routes
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(Scripted { reply, delay });
    }

    pub fn on_rpc(&self, url: &str, method: &str, result: Value) {
        self.script(rpc_key(url, method), Reply::Result(result), Duration::ZERO);
    }

    pub fn on_rpc_delayed(&self, url: &str, method: &str, result: Value, delay: Duration) {
        self.script(rpc_key(url, method), Reply::Result(result), delay);
    }

    pub fn on_rpc_error(&self, url: &str, method: &str, code: i64, message: &str) {
        self.script(
            rpc_key(url, method),
            Reply::RpcError(code, message.to_string()),
            Duration::ZERO,
        );
    }

    pub fn fail_rpc(&self, url: &str, method: &str, error: EngineError) {
        self.script(rpc_key(url, method), Reply::Fail(error), Duration::ZERO);
    }

    pub fn on_get(&self, url: &str, body: &str) {
        self.script(rest_key("GET", url), Reply::Text(body.to_string()), Duration::ZERO);
    }

    pub fn on_get_delayed(&self, url: &str, body: &str, delay: Duration) {
        self.script(rest_key("GET", url), Reply::Text(body.to_string()), delay);
    }

    pub fn fail_get(&self, url: &str, error: EngineError) {
        self.script(rest_key("GET", url), Reply::Fail(error), Duration::ZERO);
    }

    pub fn on_post(&self, url: &str, body: &str) {
        self.script(rest_key("POST", url), Reply::Text(body.to_string()), Duration::ZERO);
    }

    pub fn fail_post(&self, url: &str, error: EngineError) {
        self.script(rest_key("POST", url), Reply::Fail(error), Duration::ZERO);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests whose URL starts with `prefix`
    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.url.starts_with(prefix))
            .count()
    }

    pub fn calls_of(&self, method: &str) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    fn next(&self, key: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    async fn respond(&self, key: String, timeout: Duration) -> EngineResult<Reply> {
        let scripted = self
            .next(&key)
            .ok_or_else(|| EngineError::network_error(format!("no route for {}", key)))?;
        if scripted.delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(EngineError::new(ErrorCode::Timeout, "Request timed out"));
        }
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        match scripted.reply {
            Reply::Fail(e) => Err(e),
            other => Ok(other),
        }
    }

    fn record(&self, url: &str, method: &str, body: Value) {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            method: method.to_string(),
            body,
        });
    }
}

fn text_of(reply: Reply) -> EngineResult<String> {
    match reply {
        Reply::Text(text) => Ok(text),
        Reply::Result(value) => Ok(value.to_string()),
        _ => Err(EngineError::internal("mock: scripted reply is not text")),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_text(&self, url: &str, timeout: Duration) -> EngineResult<String> {
        self.record(url, "GET", Value::Null);
        text_of(self.respond(rest_key("GET", url), timeout).await?)
    }

    async fn post_text(&self, url: &str, body: String, timeout: Duration) -> EngineResult<String> {
        self.record(url, "POST", Value::String(body));
        text_of(self.respond(rest_key("POST", url), timeout).await?)
    }

    async fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> EngineResult<Value> {
        let method = body
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.record(url, &method, body.clone());
        match self.respond(rpc_key(url, &method), timeout).await? {
            Reply::Result(result) => Ok(json!({"jsonrpc": "2.0", "id": 1, "result": result})),
            Reply::RpcError(code, message) => Ok(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": code, "message": message}
            })),
            Reply::Text(text) => serde_json::from_str(&text)
                .map_err(|e| EngineError::parse_error(format!("Invalid JSON response: {}", e))),
            Reply::Fail(e) => Err(e),
        }
    }
}
