//! Ledger client errors.

use alloy::primitives::{Address, U256};
use alloy::providers::{PendingTransactionError, WatchTxError};
use alloy::transports::http::reqwest;
use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use identity_registry::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(Address),

    #[error("Insufficient funds: required {required} wei, available {available} wei")]
    InsufficientFunds { required: U256, available: U256 },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl LedgerError {
    /// Convert a revert raised by a registry call into the registry error it encodes.
    pub fn into_registry_error(self, identity_hash: &str) -> Self {
        match self {
            LedgerError::Reverted(reason) => {
                match RegistryError::from_revert_reason(&reason, identity_hash) {
                    Some(e) => LedgerError::Registry(e),
                    None => LedgerError::Reverted(reason),
                }
            }
            other => other,
        }
    }
}

impl From<TransportError> for LedgerError {
    fn from(error: TransportError) -> Self {
        match error {
            RpcError::ErrorResp(payload) => crate::rpc::map_rpc_error(&payload),
            RpcError::Transport(TransportErrorKind::HttpError(http)) => LedgerError::Rpc {
                code: i64::from(http.status),
                message: http.body,
            },
            RpcError::Transport(kind) => LedgerError::Transport(kind.to_string()),
            RpcError::LocalUsageError(e) => LedgerError::Signing(e.to_string()),
            RpcError::NullResp => LedgerError::InvalidResponse("unexpected null result".into()),
            other => LedgerError::InvalidResponse(other.to_string()),
        }
    }
}

impl From<PendingTransactionError> for LedgerError {
    fn from(error: PendingTransactionError) -> Self {
        match error {
            PendingTransactionError::TransportError(e) => e.into(),
            PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                LedgerError::Timeout("transaction was not confirmed in time".into())
            }
            other => LedgerError::Transport(other.to_string()),
        }
    }
}
