//! The ledger abstraction shared by the JSON-RPC client and the development ledger.

use crate::error::LedgerError;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// An EVM-style ledger.
///
/// State-changing submissions are totally ordered by the ledger and either
/// fully apply or fully abort.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Chain identifier (EIP-155).
    async fn chain_id(&self) -> Result<u64, LedgerError>;

    /// Accounts that can submit transactions through this ledger handle.
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError>;

    /// Balance of an account in wei.
    async fn balance(&self, address: Address) -> Result<U256, LedgerError>;

    /// Number of transactions sent from an account (its next nonce).
    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError>;

    /// Latest block number.
    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128, LedgerError>;

    /// Gas the transaction would consume if submitted now.
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, LedgerError>;

    /// Submit a transaction and wait until it is mined and confirmed.
    ///
    /// The transaction is submitted once; only its receipt is awaited.
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
        wait: WaitOptions,
    ) -> Result<TransactionReceipt, LedgerError>;

    /// Execute a call against the latest state without submitting it.
    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, LedgerError>;
}

#[async_trait]
impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        (**self).chain_id().await
    }

    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        (**self).accounts().await
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        (**self).balance(address).await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        (**self).transaction_count(address).await
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        (**self).block_number().await
    }

    async fn gas_price(&self) -> Result<u128, LedgerError> {
        (**self).gas_price().await
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, LedgerError> {
        (**self).estimate_gas(tx).await
    }

    async fn send_transaction(
        &self,
        tx: TransactionRequest,
        wait: WaitOptions,
    ) -> Result<TransactionReceipt, LedgerError> {
        (**self).send_transaction(tx, wait).await
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, LedgerError> {
        (**self).call(tx).await
    }
}

/// How long to wait for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Blocks that must follow the inclusion block
    pub confirmations: u64,
    /// Wall-clock bound for the whole wait
    pub timeout: Duration,
}

impl WaitOptions {
    /// Confirmations in the node's counting, where the inclusion block is the first.
    pub fn required_confirmations(&self) -> u64 {
        self.confirmations.saturating_add(1)
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            confirmations: 0,
            timeout: Duration::from_secs(750),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusion_block_counts_as_first_confirmation() {
        assert_eq!(WaitOptions::default().required_confirmations(), 1);

        let wait = WaitOptions {
            confirmations: 2,
            ..WaitOptions::default()
        };
        assert_eq!(wait.required_confirmations(), 3);
    }
}
