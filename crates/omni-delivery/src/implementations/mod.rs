//! Signer implementations.
//!
//! Available implementations:
//! - `rpc`: signing through the unlocked accounts of an EVM JSON-RPC node

pub mod rpc;

pub use rpc::*;
