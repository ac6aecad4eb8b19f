//! Registry Deployer - installs the identity registry contract on a ledger.
//!
//! The deployer:
//! - Connects to the selected network and picks the deploying account
//! - Deploys the compiled registry contract and waits for confirmation
//! - Saves the address and ABI where the mobile client picks them up
//! - Registers a sample identity as a smoke test

pub mod artifact;
pub mod config;
pub mod deploy;
pub mod error;
pub mod network;
pub mod smoke;

pub use artifact::{CompiledArtifact, DeploymentArtifact, PersistedFiles};
pub use config::Config;
pub use deploy::{Connection, Deployer, Deployment};
pub use error::DeployError;
pub use network::{Network, NetworkProfile};
pub use smoke::SmokeReport;

use config::DeployConfig;
use ledger_client::{Ledger, RegistryClient, RpcLedger};
use std::sync::Arc;
use tracing::info;

/// Result of a full provisioning run.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub deployment: Deployment,
    pub files: PersistedFiles,
    pub smoke: Option<SmokeReport>,
}

/// Deploy, persist and smoke-test using the network described by `config`.
pub async fn run(config: &Config) -> Result<Provisioned, DeployError> {
    let target = config.target()?;
    info!(network = %target.profile.network, url = %target.url, "Connecting to ledger");

    let mut ledger = RpcLedger::new(target.url.as_str(), config.deploy.request_timeout)?
        .with_poll_interval(config.deploy.poll_interval);
    if let Some(signer) = target.signer {
        info!(account = %signer.address(), "Signing transactions locally");
        ledger = ledger.with_signer(signer);
    }

    provision(Arc::new(ledger), target.profile, &config.deploy).await
}

/// Deploy, persist and smoke-test on any ledger.
pub async fn provision<L: Ledger>(
    ledger: Arc<L>,
    profile: NetworkProfile,
    settings: &DeployConfig,
) -> Result<Provisioned, DeployError> {
    let network = profile.network;
    let deployer = Deployer::new(ledger.clone(), profile);

    let connection = deployer.connect().await?;
    let compiled = CompiledArtifact::load(&settings.artifact_path).await?;
    let deployment = deployer.deploy_with(connection, &compiled).await?;

    let files = deployment
        .artifact(network.name(), compiled.abi.clone())
        .persist(&settings.assets_dir)
        .await?;

    let smoke = if settings.smoke_test {
        let client = RegistryClient::new(ledger, deployment.address, deployment.deployer)
            .with_wait(deployer.wait_options());
        Some(smoke::run(&client).await?)
    } else {
        info!("Smoke test disabled");
        None
    };

    Ok(Provisioned {
        deployment,
        files,
        smoke,
    })
}
