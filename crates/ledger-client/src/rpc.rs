//! EVM JSON-RPC ledger over HTTP.

use crate::error::LedgerError;
use crate::ledger::{Ledger, WaitOptions};
use crate::signer::TransactionSigner;
use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::json_rpc::ErrorPayload;
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::http::reqwest::{self, Url};
use async_trait::async_trait;
use identity_registry::abi;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Error code nodes use for a reverted call, with the revert data in `data`.
pub const EXECUTION_REVERTED: i64 = 3;

/// Ledger reached through a JSON-RPC endpoint (Ganache, Geth, Infura, ...).
///
/// Without a signer, transactions are submitted with `eth_sendTransaction`
/// and the node signs for its own accounts. With a signer, the provider's
/// wallet signs them locally and they go out with `eth_sendRawTransaction`.
/// Nonce, chain id and missing gas fields are filled by the provider.
#[derive(Clone)]
pub struct RpcLedger {
    client: RpcClient,
    provider: DynProvider,
    url: Url,
    signer: Option<Address>,
}

impl RpcLedger {
    /// Create a client for `url` with a per-request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let url: Url = url
            .parse()
            .map_err(|e| LedgerError::InvalidUrl(format!("{}: {}", url, e)))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let client = RpcClient::new_http_with_client(http, url.clone());
        let provider = ProviderBuilder::new()
            .connect_client(client.clone())
            .erased();

        Ok(Self {
            client,
            provider,
            url,
            signer: None,
        })
    }

    /// Sign transactions locally with `signer`.
    pub fn with_signer(self, signer: TransactionSigner) -> Self {
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(signer.into_wallet())
            .connect_client(self.client.clone())
            .erased();

        Self {
            provider,
            signer: Some(address),
            ..self
        }
    }

    /// How often pending transactions and new blocks are polled.
    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        self.client.set_poll_interval(poll_interval);
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    #[instrument(skip(self))]
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.provider.get_chain_id().await?)
    }

    #[instrument(skip(self))]
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        match self.signer {
            Some(address) => Ok(vec![address]),
            None => Ok(self.provider.get_accounts().await?),
        }
    }

    #[instrument(skip(self))]
    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        Ok(self.provider.get_balance(address).await?)
    }

    #[instrument(skip(self))]
    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        Ok(self.provider.get_transaction_count(address).pending().await?)
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        Ok(self.provider.get_block_number().await?)
    }

    #[instrument(skip(self))]
    async fn gas_price(&self) -> Result<u128, LedgerError> {
        Ok(self.provider.get_gas_price().await?)
    }

    #[instrument(skip(self, tx))]
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, LedgerError> {
        Ok(self.provider.estimate_gas(tx.clone()).await?)
    }

    #[instrument(skip(self, tx, wait), fields(from = ?tx.from))]
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
        wait: WaitOptions,
    ) -> Result<TransactionReceipt, LedgerError> {
        if let (Some(signer), Some(from)) = (self.signer, tx.from) {
            if from != signer {
                return Err(LedgerError::UnknownAccount(from));
            }
        }

        let pending = self.provider.send_transaction(tx).await?;
        let hash = *pending.tx_hash();
        debug!(tx = %hash, confirmations = wait.confirmations, "Transaction submitted");

        let receipt = pending
            .with_required_confirmations(wait.required_confirmations())
            .with_timeout(Some(wait.timeout))
            .get_receipt()
            .await
            .map_err(|e| {
                warn!(tx = %hash, error = %e, "Transaction not confirmed");
                LedgerError::from(e)
            })?;

        info!(
            tx = %hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "Transaction confirmed"
        );
        Ok(receipt)
    }

    #[instrument(skip(self, tx))]
    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, LedgerError> {
        Ok(self
            .provider
            .call(tx.clone())
            .block(BlockId::latest())
            .await?)
    }
}

/// Map a JSON-RPC error object, recognising reverts from both revert data
/// (`code 3` + `data`) and Ganache-style messages.
pub fn map_rpc_error(error: &ErrorPayload) -> LedgerError {
    if let Some(reason) = error
        .as_revert_data()
        .and_then(|data| abi::decode_revert(&data))
    {
        return LedgerError::Reverted(reason);
    }

    if let Some(reason) = revert_reason_from_message(&error.message) {
        return LedgerError::Reverted(reason);
    }

    if error.code == EXECUTION_REVERTED {
        return LedgerError::Reverted(error.message.to_string());
    }

    LedgerError::Rpc {
        code: error.code,
        message: error.message.to_string(),
    }
}

fn revert_reason_from_message(message: &str) -> Option<String> {
    const MARKERS: [&str; 3] = [
        "execution reverted: ",
        "reverted with reason string ",
        "revert ",
    ];

    MARKERS.iter().find_map(|marker| {
        message.find(marker).map(|idx| {
            message[idx + marker.len()..]
                .trim()
                .trim_matches('\'')
                .to_string()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> ErrorPayload {
        serde_json::from_str(&value.to_string()).unwrap()
    }

    #[test]
    fn test_map_error_with_revert_data() {
        let data = abi::encode_revert("Aadhaar already registered");
        let error = payload(json!({
            "code": EXECUTION_REVERTED,
            "message": "execution reverted",
            "data": data.to_string()
        }));

        match map_rpc_error(&error) {
            LedgerError::Reverted(reason) => assert_eq!(reason, "Aadhaar already registered"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_map_error_ganache_message() {
        let error = payload(json!({
            "code": -32000,
            "message": "VM Exception while processing transaction: revert Aadhaar already registered"
        }));

        match map_rpc_error(&error) {
            LedgerError::Reverted(reason) => assert_eq!(reason, "Aadhaar already registered"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_map_error_plain_rpc_error() {
        let error = payload(json!({
            "code": -32601,
            "message": "the method eth_foo does not exist"
        }));

        assert!(matches!(
            map_rpc_error(&error),
            LedgerError::Rpc { code: -32601, .. }
        ));
    }

    #[test]
    fn test_invalid_url() {
        let result = RpcLedger::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(LedgerError::InvalidUrl(_))));
    }

    #[test]
    fn test_new_ledger_has_no_signer() {
        let ledger = RpcLedger::new("http://127.0.0.1:7545", Duration::from_secs(1)).unwrap();
        assert_eq!(ledger.signer_address(), None);
        assert_eq!(ledger.url().as_str(), "http://127.0.0.1:7545/");
    }
}
