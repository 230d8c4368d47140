//! Network access
//!
//! All I/O goes through a [`Transport`]. The [`EndpointSelector`] turns an
//! ordered endpoint list into a live [`Connection`], and the chain clients
//! wrap a connection with typed calls.

pub mod esplora;
pub mod evm;
pub mod selector;
pub mod solana;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use selector::{Connection, EndpointSelector, Probe};
pub use transport::{HttpTransport, Transport};
