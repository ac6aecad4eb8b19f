//! Deployer configuration loaded from environment variables.

use crate::error::DeployError;
use crate::network::{Network, NetworkProfile};
use anyhow::{Context, Result};
use ledger_client::TransactionSigner;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Deployer configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Target network name
    #[serde(default = "default_network")]
    pub network: String,

    /// Endpoint override for any network
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// BIP-39 phrase of the deployer wallet (account index 0)
    #[serde(default)]
    pub mnemonic: Option<SecretString>,

    /// Hex private key of the deployer wallet, preferred over the mnemonic
    #[serde(default)]
    pub private_key: Option<SecretString>,

    /// Infura project id for the hosted networks
    #[serde(default)]
    pub infura_project_id: Option<String>,

    /// Deployment configuration
    #[serde(default)]
    pub deploy: DeployConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Compiled contract artifact (`{contractName, abi, bytecode}`)
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,

    /// Directory receiving `contract_abi.json` and `contract_address.txt`
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Register a sample identity after deploying
    #[serde(default = "default_true")]
    pub smoke_test: bool,

    /// Receipt poll interval
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
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

/// Where and how to connect, after validation.
#[derive(Debug)]
pub struct Target {
    pub profile: NetworkProfile,
    pub url: String,
    pub signer: Option<TransactionSigner>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            artifact_path: default_artifact_path(),
            assets_dir: default_assets_dir(),
            smoke_test: default_true(),
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
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

impl Default for Config {
    fn default() -> Self {
        Self {
            network: default_network(),
            rpc_url: None,
            mnemonic: None,
            private_key: None,
            infura_project_id: None,
            deploy: DeployConfig::default(),
            log: LogConfig::default(),
        }
    }
}

fn default_network() -> String {
    "development".into()
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("build/contracts/AadhaarVerification.json")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
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

        Ok(config)
    }

    pub fn network(&self) -> Result<Network, DeployError> {
        self.network.parse()
    }

    /// Validate the configuration and resolve the deployment target.
    pub fn target(&self) -> Result<Target, DeployError> {
        let network = self.network()?;
        let profile = network.profile();

        let url = match non_empty(self.rpc_url.as_deref()) {
            Some(url) => url.to_string(),
            None => network.default_url(non_empty(self.infura_project_id.as_deref()))?,
        };

        let signer = self.signer()?;
        if profile.requires_signer && signer.is_none() {
            return Err(DeployError::Config(format!(
                "MNEMONIC or PRIVATE_KEY is required for network {}",
                network
            )));
        }

        if self.deploy.request_timeout.is_zero() {
            return Err(DeployError::Config(
                "DEPLOY__REQUEST_TIMEOUT must be non-zero".into(),
            ));
        }

        Ok(Target {
            profile,
            url,
            signer,
        })
    }

    fn signer(&self) -> Result<Option<TransactionSigner>, DeployError> {
        let invalid = |e: ledger_client::LedgerError| DeployError::Config(e.to_string());

        if let Some(key) = self.private_key.as_ref().filter(|k| is_set(k)) {
            return TransactionSigner::from_private_key(key)
                .map(Some)
                .map_err(invalid);
        }
        if let Some(phrase) = self.mnemonic.as_ref().filter(|p| is_set(p)) {
            return TransactionSigner::from_mnemonic(phrase, 0)
                .map(Some)
                .map_err(invalid);
        }
        Ok(None)
    }
}

fn is_set(secret: &SecretString) -> bool {
    !secret.expose_secret().trim().is_empty()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_development_defaults() {
        let config = Config::default();
        let target = config.target().unwrap();

        assert_eq!(target.url, "http://127.0.0.1:7545");
        assert_eq!(target.profile.confirmations, 0);
        assert!(target.signer.is_none());
        assert!(config.deploy.smoke_test);
    }

    #[test]
    fn test_hosted_network_requires_credentials() {
        let config = Config {
            network: "goerli".into(),
            infura_project_id: Some("abc".into()),
            ..Config::default()
        };

        let err = config.target().unwrap_err();
        assert!(err.to_string().contains("MNEMONIC or PRIVATE_KEY"));
    }

    #[test]
    fn test_hosted_network_requires_endpoint() {
        let config = Config {
            network: "mumbai".into(),
            mnemonic: Some(SecretString::new(DEV_MNEMONIC.into())),
            ..Config::default()
        };

        let err = config.target().unwrap_err();
        assert!(err.to_string().contains("INFURA_PROJECT_ID"));
    }

    #[test]
    fn test_goerli_with_mnemonic() {
        let config = Config {
            network: "goerli".into(),
            mnemonic: Some(SecretString::new(DEV_MNEMONIC.into())),
            infura_project_id: Some("abc".into()),
            ..Config::default()
        };

        let target = config.target().unwrap();
        assert_eq!(target.url, "https://goerli.infura.io/v3/abc");
        assert_eq!(target.profile.chain_id, Some(5));
        assert!(target.signer.is_some());
    }

    #[test]
    fn test_private_key_preferred_and_rpc_url_override() {
        let config = Config {
            network: "mumbai".into(),
            rpc_url: Some("http://localhost:9545".into()),
            private_key: Some(SecretString::new(DEV_KEY.into())),
            mnemonic: Some(SecretString::new("not a valid phrase".into())),
            ..Config::default()
        };

        let target = config.target().unwrap();
        assert_eq!(target.url, "http://localhost:9545");
        assert!(target.signer.is_some());
    }

    #[test]
    fn test_blank_secrets_are_ignored() {
        let config = Config {
            private_key: Some(SecretString::new("  ".into())),
            ..Config::default()
        };
        assert!(config.target().unwrap().signer.is_none());
    }

    #[test]
    fn test_invalid_private_key() {
        let config = Config {
            private_key: Some(SecretString::new("0x1234".into())),
            ..Config::default()
        };
        assert!(matches!(config.target(), Err(DeployError::Config(_))));
    }

    fn from_string_values(values: &[(&str, &str)]) -> Result<Config, config::ConfigError> {
        values
            .iter()
            .try_fold(config::Config::builder(), |builder, (key, value)| {
                builder.set_override(*key, *value)
            })?
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_smoke_test_flag_from_string_values() {
        for (value, expected) in [("false", false), ("0", false), ("off", false), ("yes", true)] {
            let config = from_string_values(&[("deploy.smoke_test", value)]).unwrap();
            assert_eq!(config.deploy.smoke_test, expected, "DEPLOY__SMOKE_TEST={}", value);
        }

        let config = from_string_values(&[]).unwrap();
        assert!(config.deploy.smoke_test);

        assert!(from_string_values(&[("deploy.smoke_test", "maybe")]).is_err());
    }
}
