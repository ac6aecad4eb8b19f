//! Contract deployment.

use crate::artifact::{CompiledArtifact, DeploymentArtifact};
use crate::error::DeployError;
use crate::network::NetworkProfile;
use alloy::primitives::{Address, B256, U256};
use alloy::network::TransactionBuilder;
use chrono::Utc;
use ledger_client::{Ledger, TransactionRequest, WaitOptions};
use tracing::{info, instrument, warn};

/// A contract that has been mined and confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub deployer: Address,
    pub chain_id: u64,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
}

impl Deployment {
    /// Pair the deployment with the interface description clients need.
    pub fn artifact(&self, network: &str, abi: serde_json::Value) -> DeploymentArtifact {
        DeploymentArtifact {
            address: self.address,
            abi,
            network: network.to_string(),
            chain_id: self.chain_id,
            transaction_hash: self.transaction_hash,
            block_number: self.block_number,
            deployed_at: Utc::now(),
        }
    }
}

/// The endpoint's chain id and the account deployments are sent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub chain_id: u64,
    pub account: Address,
}

/// Deploys compiled contracts on a ledger according to a network profile.
pub struct Deployer<L> {
    ledger: L,
    profile: NetworkProfile,
}

impl<L: Ledger> Deployer<L> {
    pub fn new(ledger: L, profile: NetworkProfile) -> Self {
        Self { ledger, profile }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Receipt waiting for this network.
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            confirmations: self.profile.confirmations,
            timeout: self.profile.wait_timeout(),
        }
    }

    /// Check the endpoint's chain id and pick the deploying account.
    pub async fn connect(&self) -> Result<Connection, DeployError> {
        let chain_id = self.ledger.chain_id().await?;
        self.profile.check_chain_id(chain_id)?;

        let accounts = self.ledger.accounts().await?;
        let deployer = accounts.first().copied().ok_or_else(|| {
            DeployError::Deployment("endpoint exposes no accounts to deploy from".into())
        })?;

        info!(network = %self.profile.network, chain_id, %deployer, "Deploying from account");
        Ok(Connection {
            chain_id,
            account: deployer,
        })
    }

    /// Connect, deploy `artifact` and wait until it is confirmed.
    pub async fn deploy(&self, artifact: &CompiledArtifact) -> Result<Deployment, DeployError> {
        let connection = self.connect().await?;
        self.deploy_with(connection, artifact).await
    }

    /// Deploy `artifact` over an established connection.
    #[instrument(skip(self, artifact), fields(contract = %artifact.contract_name))]
    pub async fn deploy_with(
        &self,
        connection: Connection,
        artifact: &CompiledArtifact,
    ) -> Result<Deployment, DeployError> {
        let Connection {
            chain_id,
            account: deployer,
        } = connection;

        let tx = TransactionRequest::default()
            .with_from(deployer)
            .with_deploy_code(artifact.bytecode.clone());
        let gas = self.ledger.estimate_gas(&tx).await?;
        let gas_price = self.ledger.gas_price().await?;

        info!(estimated_gas = gas, gas_price, "Estimated deployment cost");

        if let Some(cap) = self.profile.gas_cap {
            if gas > cap {
                return Err(DeployError::Deployment(format!(
                    "estimated gas {} exceeds the {} limit of {}",
                    gas, self.profile.network, cap
                )));
            }
        }

        let required = U256::from(gas) * U256::from(gas_price);
        let available = self.ledger.balance(deployer).await?;
        if available < required {
            warn!(%deployer, %required, %available, "Deployer cannot pay for deployment");
            return Err(DeployError::InsufficientFunds {
                required,
                available,
            });
        }

        let receipt = self
            .ledger
            .send_transaction(
                tx.with_gas_limit(gas).with_gas_price(gas_price),
                self.wait_options(),
            )
            .await?;
        let hash = receipt.transaction_hash;
        if !receipt.status() {
            return Err(DeployError::Deployment(format!(
                "deployment transaction {} failed",
                hash
            )));
        }

        let address = receipt.contract_address.ok_or_else(|| {
            DeployError::Deployment(format!("receipt for {} has no contract address", hash))
        })?;
        let block_number = receipt.block_number.ok_or_else(|| {
            DeployError::Deployment(format!("receipt for {} has no block number", hash))
        })?;

        info!(
            %address,
            tx = %hash,
            block = block_number,
            gas_used = receipt.gas_used,
            "Contract deployed"
        );

        Ok(Deployment {
            address,
            deployer,
            chain_id,
            transaction_hash: hash,
            block_number,
            gas_used: receipt.gas_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use alloy::primitives::Bytes;
    use dev_ledger::config::ChainConfig;
    use dev_ledger::DevLedger;
    use std::sync::Arc;
    use std::time::Duration;

    fn artifact() -> CompiledArtifact {
        let json = br#"{"contractName":"AadhaarVerification","bytecode":"0x6080604052"}"#;
        CompiledArtifact::from_slice(json).unwrap()
    }

    #[tokio::test]
    async fn test_deploy_on_dev_ledger() {
        let ledger = Arc::new(DevLedger::default());
        let deployer = Deployer::new(ledger.clone(), Network::Development.profile());

        let deployment = deployer.deploy(&artifact()).await.unwrap();

        assert_ne!(deployment.address, Address::ZERO);
        assert_eq!(deployment.chain_id, 1337);
        assert_eq!(deployment.block_number, 1);
        assert_eq!(deployment.address, deployment.deployer.create(0));
        assert_eq!(
            ledger.code(deployment.address).await,
            Some(Bytes::from(vec![0x60, 0x80, 0x60, 0x40, 0x52]))
        );
    }

    #[tokio::test]
    async fn test_chain_id_mismatch_is_config_error() {
        let ledger = DevLedger::default();
        let deployer = Deployer::new(ledger, Network::Goerli.profile());

        let result = deployer.deploy(&artifact()).await;
        assert!(matches!(result, Err(DeployError::Config(_))));
    }

    #[tokio::test]
    async fn test_gas_cap_enforced() {
        let ledger = DevLedger::default();
        let profile = NetworkProfile {
            gas_cap: Some(50_000),
            ..Network::Development.profile()
        };
        let deployer = Deployer::new(ledger, profile);

        let result = deployer.deploy(&artifact()).await;
        assert!(matches!(result, Err(DeployError::Deployment(ref m)) if m.contains("exceeds")));
    }

    #[tokio::test]
    async fn test_unfunded_deployer() {
        let ledger = Arc::new(DevLedger::new(ChainConfig {
            initial_balance_eth: 0,
            ..ChainConfig::default()
        }));
        let deployer = Deployer::new(ledger.clone(), Network::Development.profile());

        let result = deployer.deploy(&artifact()).await;
        assert!(matches!(result, Err(DeployError::InsufficientFunds { .. })));
        assert_eq!(ledger.block_number().await.unwrap(), 0);
    }

    #[test]
    fn test_wait_options_follow_profile() {
        let deployer = Deployer::new(DevLedger::default(), Network::Goerli.profile());
        let wait = deployer.wait_options();
        assert_eq!(wait.confirmations, 2);
        assert_eq!(wait.required_confirmations(), 3);
        assert_eq!(wait.timeout, Duration::from_secs(12 * 202));
    }
}
