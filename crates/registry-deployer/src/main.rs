//! Registry Deployer - Entry point.

use registry_deployer::Config;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let json = config.log.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    info!(network = %config.network, "Starting registry deployment");

    match registry_deployer::run(&config).await {
        Ok(provisioned) => {
            info!(
                address = %provisioned.deployment.address,
                abi = %provisioned.files.abi.display(),
                address_file = %provisioned.files.address.display(),
                "Contract info saved"
            );
            if let Some(report) = provisioned.smoke {
                info!(
                    record_count = report.record_count,
                    is_registered = report.is_registered,
                    "Smoke test complete"
                );
            }
        }
        Err(e) => {
            error!("Deployment failed: {}", e);
            std::process::exit(1);
        }
    }
}
