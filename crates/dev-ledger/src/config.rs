//! Configuration for the development ledger.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

/// Development ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// JSON-RPC server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Chain parameters
    #[serde(default)]
    pub chain: ChainConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// EIP-155 chain id
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Number of unlocked, pre-funded accounts
    #[serde(default = "default_accounts")]
    pub accounts: usize,

    /// Starting balance of every account, in ether
    #[serde(default = "default_initial_balance_eth")]
    pub initial_balance_eth: u64,

    /// Gas price reported by `eth_gasPrice`, in wei
    #[serde(default = "default_gas_price")]
    pub gas_price: u64,

    /// Maximum gas a single transaction may use
    #[serde(default = "default_block_gas_limit")]
    pub block_gas_limit: u64,

    /// Seed the account addresses are derived from
    #[serde(default = "default_seed")]
    pub seed: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl ServerConfig {
    /// The address the JSON-RPC server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen_addr.parse().with_context(|| {
            format!("SERVER__LISTEN_ADDR is not an IP address: {}", self.listen_addr)
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            accounts: default_accounts(),
            initial_balance_eth: default_initial_balance_eth(),
            gas_price: default_gas_price(),
            block_gas_limit: default_block_gas_limit(),
            seed: default_seed(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    7545
}

fn default_chain_id() -> u64 {
    1337
}

fn default_accounts() -> usize {
    10
}

fn default_initial_balance_eth() -> u64 {
    100
}

fn default_gas_price() -> u64 {
    20_000_000_000
}

fn default_block_gas_limit() -> u64 {
    6_721_975
}

fn default_seed() -> String {
    "aadhaar-dev-ledger".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject parameters the ledger cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;
        if self.chain.accounts == 0 {
            bail!("CHAIN__ACCOUNTS must be at least 1");
        }
        if self.chain.chain_id == 0 {
            bail!("CHAIN__CHAIN_ID must be non-zero");
        }
        if self.chain.block_gas_limit < 21_000 {
            bail!("CHAIN__BLOCK_GAS_LIMIT must cover a plain transfer (21000)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_ganache_development_network() {
        let config = Config::default();
        assert_eq!(config.server.port, 7545);
        assert_eq!(config.chain.chain_id, 1337);
        assert_eq!(config.chain.accounts, 10);
        assert_eq!(config.chain.gas_price, 20_000_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_accounts() {
        let mut config = Config::default();
        config.chain.accounts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_invalid_listen_addr() {
        let mut config = Config::default();
        config.server.listen_addr = "localhost:7545".into();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SERVER__LISTEN_ADDR"));
    }

    #[test]
    fn test_socket_addr() {
        let mut config = Config::default();
        config.server.listen_addr = "0.0.0.0".into();
        config.server.port = 8545;
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "0.0.0.0:8545".parse::<SocketAddr>().unwrap()
        );
    }
}
