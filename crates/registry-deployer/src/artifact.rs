//! Compiled contract input and deployment artifact output.

use crate::error::DeployError;
use alloy::primitives::{Address, Bytes, B256};
use chrono::{DateTime, Utc};
use identity_registry::abi;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// ABI file read by the mobile client.
pub const ABI_FILE: &str = "contract_abi.json";
/// Address file read by the mobile client.
pub const ADDRESS_FILE: &str = "contract_address.txt";
/// Combined record for tooling.
pub const DEPLOYMENT_FILE: &str = "deployment.json";

/// Compiler output for the registry contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
    #[serde(default = "default_contract_name")]
    pub contract_name: String,

    #[serde(default)]
    pub abi: Value,

    pub bytecode: Bytes,
}

fn default_contract_name() -> String {
    abi::CONTRACT_NAME.to_string()
}

impl CompiledArtifact {
    /// Read and validate a compiled artifact.
    pub async fn load(path: &Path) -> Result<Self, DeployError> {
        let data = fs::read(path).await.map_err(|e| {
            DeployError::Artifact(format!("cannot read {}: {}", path.display(), e))
        })?;
        let artifact = Self::from_slice(&data)?;
        debug!(
            path = %path.display(),
            contract = %artifact.contract_name,
            bytecode_len = artifact.bytecode.len(),
            "Loaded compiled artifact"
        );
        Ok(artifact)
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, DeployError> {
        let mut artifact: Self = serde_json::from_slice(data)
            .map_err(|e| DeployError::Artifact(format!("malformed artifact: {}", e)))?;

        if artifact.bytecode.is_empty() {
            return Err(DeployError::Artifact(format!(
                "{} has no bytecode",
                artifact.contract_name
            )));
        }

        // Fall back to the known interface when the compiler output omits it.
        let has_abi = artifact.abi.as_array().is_some_and(|a| !a.is_empty());
        if !has_abi {
            artifact.abi = abi::interface_description();
        }

        Ok(artifact)
    }
}

/// Everything a client needs to reach a deployed registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentArtifact {
    pub address: Address,
    pub abi: Value,
    pub network: String,
    pub chain_id: u64,
    pub transaction_hash: B256,
    pub block_number: u64,
    pub deployed_at: DateTime<Utc>,
}

/// Paths written by [`DeploymentArtifact::persist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedFiles {
    pub abi: PathBuf,
    pub address: PathBuf,
    pub deployment: PathBuf,
}

impl DeploymentArtifact {
    /// Write the ABI, address and combined record into `dir`, creating it if needed.
    pub async fn persist(&self, dir: &Path) -> Result<PersistedFiles, DeployError> {
        fs::create_dir_all(dir).await?;

        let files = PersistedFiles {
            abi: dir.join(ABI_FILE),
            address: dir.join(ADDRESS_FILE),
            deployment: dir.join(DEPLOYMENT_FILE),
        };

        write_atomic(&files.abi, serde_json::to_string_pretty(&self.abi)?.as_bytes()).await?;
        // Checksummed, no trailing newline
        write_atomic(&files.address, self.address.to_checksum(None).as_bytes()).await?;
        write_atomic(&files.deployment, serde_json::to_string_pretty(self)?.as_bytes()).await?;

        info!(dir = %dir.display(), address = %self.address, "Deployment artifact saved");
        Ok(files)
    }

    /// Read a previously persisted `deployment.json`.
    pub async fn load(dir: &Path) -> Result<Self, DeployError> {
        let data = fs::read(dir.join(DEPLOYMENT_FILE)).await?;
        Ok(serde_json::from_slice(&data)?)
    }
}

/// Write using temp file + rename.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), DeployError> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}
