//! Network profiles the deployer can target.

use crate::error::DeployError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A named deployment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Local development ledger
    Development,
    /// Ethereum Goerli testnet
    Goerli,
    /// Polygon Mumbai testnet
    Mumbai,
}

/// Connection and confirmation parameters for a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub network: Network,
    /// Required chain id, `None` accepts any
    pub chain_id: Option<u64>,
    /// Upper bound on the deployment's gas
    pub gas_cap: Option<u64>,
    /// Blocks that must follow the inclusion block
    pub confirmations: u64,
    /// Blocks to wait for inclusion before giving up
    pub timeout_blocks: u64,
    /// Typical interval between blocks
    pub block_time: Duration,
    /// Whether a local signer is mandatory
    pub requires_signer: bool,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Development => "development",
            Network::Goerli => "goerli",
            Network::Mumbai => "mumbai",
        }
    }

    pub fn profile(&self) -> NetworkProfile {
        match self {
            Network::Development => NetworkProfile {
                network: *self,
                chain_id: None,
                gas_cap: None,
                confirmations: 0,
                timeout_blocks: 50,
                block_time: Duration::from_secs(1),
                requires_signer: false,
            },
            Network::Goerli => NetworkProfile {
                network: *self,
                chain_id: Some(5),
                gas_cap: Some(5_500_000),
                confirmations: 2,
                timeout_blocks: 200,
                block_time: Duration::from_secs(12),
                requires_signer: true,
            },
            Network::Mumbai => NetworkProfile {
                network: *self,
                chain_id: Some(80001),
                gas_cap: None,
                confirmations: 2,
                timeout_blocks: 200,
                block_time: Duration::from_secs(2),
                requires_signer: true,
            },
        }
    }

    /// Default JSON-RPC endpoint. Hosted networks need an Infura project id.
    pub fn default_url(&self, infura_project_id: Option<&str>) -> Result<String, DeployError> {
        let hosted = |host: &str| {
            infura_project_id
                .map(|id| format!("https://{}.infura.io/v3/{}", host, id))
                .ok_or_else(|| {
                    DeployError::Config(format!(
                        "INFURA_PROJECT_ID or RPC_URL is required for network {}",
                        self
                    ))
                })
        };

        match self {
            Network::Development => Ok("http://127.0.0.1:7545".to_string()),
            Network::Goerli => hosted("goerli"),
            Network::Mumbai => hosted("polygon-mumbai"),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Network::Development),
            "goerli" => Ok(Network::Goerli),
            "mumbai" => Ok(Network::Mumbai),
            other => Err(DeployError::Config(format!(
                "unknown network '{}' (expected development, goerli or mumbai)",
                other
            ))),
        }
    }
}

impl NetworkProfile {
    /// Wall-clock bound for a transaction to be mined and confirmed.
    pub fn wait_timeout(&self) -> Duration {
        let blocks = self.timeout_blocks.saturating_add(self.confirmations);
        self.block_time.saturating_mul(u32::try_from(blocks).unwrap_or(u32::MAX))
    }

    /// Reject an endpoint whose chain id does not match the profile.
    pub fn check_chain_id(&self, actual: u64) -> Result<(), DeployError> {
        match self.chain_id {
            Some(expected) if expected != actual => Err(DeployError::Config(format!(
                "network {} expects chain id {}, endpoint reports {}",
                self.network, expected, actual
            ))),
            _ => Ok(()),
        }
    }
}
