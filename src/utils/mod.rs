//! Utilities Module
//!
//! Common utilities used across the crate.

pub mod cache;
pub mod logging;
pub mod units;

pub use cache::TtlCache;
