//! Structured logging with redaction
//!
//! Every entry is one line on stderr:
//! `[timestamp] LEVEL [module] message | key=value ...`
//!
//! Field values are redacted by key name: secrets are replaced entirely,
//! addresses and hashes are shortened, and endpoint URLs lose their path
//! and query (RPC providers embed API keys there).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        })
    }
}

/// How a field value is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Redaction {
    Full,
    Address,
    Hash,
    Url,
    None,
}

const SECRET_KEYS: &[&str] = &[
    "private", "secret", "seed", "mnemonic", "password", "passphrase", "wif", "keypair",
    "signing_key",
];
const ADDRESS_KEYS: &[&str] = &["address", "from", "to", "recipient", "sender", "owner", "contract"];
const HASH_KEYS: &[&str] = &["txid", "tx_hash", "txhash", "hash", "signature", "blockhash"];
const URL_KEYS: &[&str] = &["url", "endpoint", "rpc"];

fn classify(key: &str) -> Redaction {
    let key = key.to_ascii_lowercase();
    if SECRET_KEYS.iter().any(|k| key.contains(k)) {
        Redaction::Full
    } else if URL_KEYS.iter().any(|k| key == *k || key.ends_with(&format!("_{}", k))) {
        Redaction::Url
    } else if HASH_KEYS.iter().any(|k| key == *k || key.ends_with(&format!("_{}", k))) {
        Redaction::Hash
    } else if ADDRESS_KEYS.iter().any(|k| key == *k || key.ends_with(&format!("_{}", k))) {
        Redaction::Address
    } else {
        Redaction::None
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field, redacted according to its key
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        let shown = match classify(key) {
            Redaction::Full => redact_value(&value),
            Redaction::Address => redact_address(&value),
            Redaction::Hash => redact_hash(&value),
            Redaction::Url => redact_url(&value),
            Redaction::None => value,
        };
        self.fields.push((key, shown));
        self
    }

    pub fn enabled(&self) -> bool {
        self.level != LogLevel::Debug || is_debug_enabled()
    }

    /// Formatted line without the timestamp
    pub fn render(&self) -> String {
        let mut line = format!("{} [{}] {}", self.level, self.module, self.message);
        if !self.fields.is_empty() {
            let fields = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            line.push_str(" | ");
            line.push_str(&fields);
        }
        line
    }

    pub fn log(self) {
        if !self.enabled() {
            return;
        }
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

fn redact_value(value: &str) -> String {
    match value.len() {
        0 => "[EMPTY]".to_string(),
        1..=4 => "[REDACTED]".to_string(),
        len => format!("[REDACTED:{}chars]", len),
    }
}

/// First 6 (8 with `0x`) and last 4 characters
fn redact_address(address: &str) -> String {
    let trimmed = address.trim();
    let prefix_len = if trimmed.starts_with("0x") { 8 } else { 6 };
    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }
    if !trimmed.is_ascii() || trimmed.len() <= prefix_len + 4 + 3 {
        return redact_value(trimmed);
    }
    format!("{}...{}", &trimmed[..prefix_len], &trimmed[trimmed.len() - 4..])
}

/// Hashes are public but long; keep enough to look them up.
fn redact_hash(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() <= 20 || !trimmed.is_ascii() {
        return trimmed.to_string();
    }
    let prefix_len = if trimmed.starts_with("0x") { 12 } else { 10 };
    format!("{}...{}", &trimmed[..prefix_len], &trimmed[trimmed.len() - 6..])
}

/// Scheme, host and port only
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("?");
            let hidden = parsed.path().len() > 1 || parsed.query().is_some();
            let mut out = match parsed.port() {
                Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
                None => format!("{}://{}", parsed.scheme(), host),
            };
            if hidden {
                out.push_str("/…");
            }
            out
        }
        Err(_) => redact_value(raw),
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:ident, $module:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::$level,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($args:tt)*) => { $crate::__log_at!(Debug, $($args)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($args:tt)*) => { $crate::__log_at!(Info, $($args)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($args:tt)*) => { $crate::__log_at!(Warn, $($args)*) };
}
