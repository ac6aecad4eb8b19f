//! Post-deployment smoke test.

use crate::error::DeployError;
use identity_registry::Registration;
use ledger_client::{Ledger, RegistryClient};
use tracing::info;

/// Identity hash registered by the smoke test.
pub const SAMPLE_IDENTITY_HASH: &str = "test_hash_123";

/// The sample identity registered after deployment.
pub fn sample_registration() -> Registration {
    Registration::new(
        SAMPLE_IDENTITY_HASH,
        "Test User",
        "01/01/1990",
        "Male",
        "address_hash_456",
        "encrypted_data_789",
    )
}

/// What the smoke test observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeReport {
    pub record_count: u64,
    pub is_registered: bool,
}

/// Register the sample identity, then read back the count and registration flag.
pub async fn run<L: Ledger>(client: &RegistryClient<L>) -> Result<SmokeReport, DeployError> {
    info!(address = %client.address(), "Testing contract");

    client.register(sample_registration()).await?;

    let record_count = client.record_count().await?;
    info!(record_count, "Total records");

    let is_registered = client.is_registered(SAMPLE_IDENTITY_HASH).await?;
    info!(is_registered, "Sample identity registered");

    Ok(SmokeReport {
        record_count,
        is_registered,
    })
}
