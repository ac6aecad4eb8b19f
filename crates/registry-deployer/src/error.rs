//! Error types for the deployer.

use alloy::primitives::U256;
use identity_registry::RegistryError;
use ledger_client::LedgerError;
use thiserror::Error;

/// Deployer error types.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Deployment failed: {0}")]
    Deployment(String),

    #[error("Insufficient funds: deployment needs {required} wei, account holds {available} wei")]
    InsufficientFunds { required: U256, available: U256 },

    #[error("Invalid compiled artifact: {0}")]
    Artifact(String),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<LedgerError> for DeployError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Registry(e) => DeployError::Registry(e),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => DeployError::InsufficientFunds {
                required,
                available,
            },
            other => DeployError::Ledger(other),
        }
    }
}
