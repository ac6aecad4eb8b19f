//! Ledger access for the identity registry.
//!
//! - [`Ledger`] - the operations an EVM-style ledger offers
//! - [`RpcLedger`] - an alloy HTTP provider, optionally signing locally
//! - [`RegistryClient`] - typed calls to a deployed registry contract

mod error;
mod ledger;
mod registry_client;
mod rpc;
mod signer;

pub use error::LedgerError;
pub use ledger::{Ledger, WaitOptions};
pub use registry_client::RegistryClient;
pub use rpc::{map_rpc_error, RpcLedger, EXECUTION_REVERTED};
pub use signer::TransactionSigner;

pub use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
