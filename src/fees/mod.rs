//! Fee Estimation Module
//!
//! Gas-oracle and static-table fee estimates with USD conversion.

mod estimator;
mod prices;

pub use estimator::*;
pub use prices::PriceOracle;
