//! Balance Aggregation Module
//!
//! Concurrent balance lookups across every configured chain.

pub mod aggregator;

pub use aggregator::BalanceAggregator;
