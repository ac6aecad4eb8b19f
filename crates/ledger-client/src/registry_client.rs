//! Typed client for a deployed registry contract.

use crate::error::LedgerError;
use crate::ledger::{Ledger, WaitOptions};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use identity_registry::{abi, Registration, Verification};
use tracing::{info, instrument, warn};

/// Calls a registry contract deployed at `address` on any [`Ledger`].
///
/// Revert reasons raised by the contract come back as
/// [`LedgerError::Registry`].
#[derive(Debug, Clone)]
pub struct RegistryClient<L> {
    ledger: L,
    address: Address,
    from: Address,
    wait: WaitOptions,
}

impl<L: Ledger> RegistryClient<L> {
    /// Client for the contract at `address`, submitting from `from`.
    pub fn new(ledger: L, address: Address, from: Address) -> Self {
        Self {
            ledger,
            address,
            from,
            wait: WaitOptions::default(),
        }
    }

    /// Override how registrations wait for their receipt.
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Register an identity. Fails with `DuplicateIdentity` if the hash exists.
    #[instrument(skip(self, registration), fields(identity_hash = %registration.identity_hash))]
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<TransactionReceipt, LedgerError> {
        let identity_hash = registration.identity_hash.clone();
        let tx = self.request(abi::encode_register(registration));

        let gas = self
            .ledger
            .estimate_gas(&tx)
            .await
            .map_err(|e| e.into_registry_error(&identity_hash))?;
        let gas_price = self.ledger.gas_price().await?;

        let tx = tx.with_gas_limit(gas).with_gas_price(gas_price);
        let receipt = self
            .ledger
            .send_transaction(tx, self.wait)
            .await
            .map_err(|e| e.into_registry_error(&identity_hash))?;

        let hash = receipt.transaction_hash;
        if !receipt.status() {
            warn!(tx = %hash, "Registration transaction failed");
            return Err(LedgerError::Reverted(format!(
                "registration transaction {} failed",
                hash
            )));
        }

        info!(tx = %hash, block = ?receipt.block_number, "Identity registered");
        Ok(receipt)
    }

    /// Verify a registered identity. Fails with `RecordNotFound` if absent.
    pub async fn verify(&self, identity_hash: &str) -> Result<Verification, LedgerError> {
        let output = self
            .view(abi::encode_verify(identity_hash))
            .await
            .map_err(|e| e.into_registry_error(identity_hash))?;
        abi::decode_verification(&output).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    pub async fn is_registered(&self, identity_hash: &str) -> Result<bool, LedgerError> {
        let output = self.view(abi::encode_is_registered(identity_hash)).await?;
        abi::decode_bool(&output).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    pub async fn record_count(&self) -> Result<u64, LedgerError> {
        let output = self.view(abi::encode_record_count()).await?;
        abi::decode_count(&output).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    fn request(&self, data: Bytes) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.address)
            .with_input(data)
    }

    async fn view(&self, data: Bytes) -> Result<Bytes, LedgerError> {
        self.ledger.call(&self.request(data)).await
    }
}
