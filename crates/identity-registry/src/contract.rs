//! ABI dispatcher that runs contract calls against a [`Registry`].

use crate::abi::{self, IAadhaarVerificationCalls};
use crate::error::RegistryError;
use crate::record::{CallContext, Registration};
use crate::registry::Registry;
use alloy::primitives::Bytes;
use alloy::sol_types::SolInterface;
use tracing::debug;

/// Outcome of a successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// ABI-encoded return data
    pub output: Bytes,
    /// Number of storage records written (drives the gas model)
    pub records_written: u32,
}

impl Execution {
    fn read(output: Bytes) -> Self {
        Self {
            output,
            records_written: 0,
        }
    }
}

/// A failed call. No state was changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reverted {
    pub reason: String,
}

impl Reverted {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Solidity `Error(string)` encoding of the reason.
    pub fn data(&self) -> Bytes {
        abi::encode_revert(&self.reason)
    }
}

impl From<RegistryError> for Reverted {
    fn from(e: RegistryError) -> Self {
        Reverted::new(e.revert_reason())
    }
}

/// The registry as a deployable contract.
#[derive(Debug, Clone, Default)]
pub struct RegistryContract {
    registry: Registry,
}

impl RegistryContract {
    /// A freshly deployed contract: empty registry, count 0.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Read access to the underlying state.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Execute calldata as part of a transaction.
    pub fn execute(&mut self, ctx: &CallContext, calldata: &[u8]) -> Result<Execution, Reverted> {
        let call = decode(calldata)?;
        self.dispatch(ctx, call)
    }

    /// Execute calldata without persisting any change (`eth_call`).
    pub fn simulate(&self, ctx: &CallContext, calldata: &[u8]) -> Result<Execution, Reverted> {
        match decode(calldata)? {
            call @ IAadhaarVerificationCalls::registerAadhaar(_) => {
                let mut scratch = self.clone();
                scratch.dispatch(ctx, call)
            }
            other => self.view_call(other),
        }
    }

    fn dispatch(
        &mut self,
        ctx: &CallContext,
        call: IAadhaarVerificationCalls,
    ) -> Result<Execution, Reverted> {
        match call {
            IAadhaarVerificationCalls::registerAadhaar(call) => {
                let registration = Registration::from(call);
                debug!(
                    identity_hash = %registration.identity_hash,
                    sender = %ctx.sender,
                    "registerAadhaar"
                );
                self.registry.register(registration, ctx)?;
                Ok(Execution {
                    output: Bytes::new(),
                    records_written: 1,
                })
            }
            other => self.view_call(other),
        }
    }

    fn view_call(&self, call: IAadhaarVerificationCalls) -> Result<Execution, Reverted> {
        let output = match call {
            IAadhaarVerificationCalls::verifyAadhaar(call) => {
                let verification = self.registry.verify(&call.aadhaarHash)?;
                abi::encode_verification(&verification)
            }
            IAadhaarVerificationCalls::isAadhaarRegistered(call) => {
                abi::encode_bool(self.registry.is_registered(&call.aadhaarHash))
            }
            IAadhaarVerificationCalls::getRecordCount(_) => {
                abi::encode_count(self.registry.record_count())
            }
            IAadhaarVerificationCalls::registerAadhaar(_) => {
                return Err(Reverted::new("registerAadhaar is not a view function"))
            }
        };
        Ok(Execution::read(output))
    }
}

fn decode(calldata: &[u8]) -> Result<IAadhaarVerificationCalls, Reverted> {
    IAadhaarVerificationCalls::abi_decode(calldata).map_err(|_| {
        let known = calldata.len() >= 4 && {
            let mut selector = [0u8; 4];
            selector.copy_from_slice(&calldata[..4]);
            IAadhaarVerificationCalls::valid_selector(selector)
        };
        if known {
            Reverted::new("invalid calldata")
        } else {
            Reverted::new("unknown function selector")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DUPLICATE_REASON;
    use alloy::primitives::Address;
    use chrono::Utc;

    fn ctx() -> CallContext {
        CallContext::new(Address::repeat_byte(1), 1, Utc::now())
    }

    fn registration() -> Registration {
        Registration::new(
            "test_hash_123",
            "Test User",
            "01/01/1990",
            "Male",
            "address_hash_456",
            "encrypted_data_789",
        )
    }

    #[test]
    fn test_execute_register_then_views() {
        let mut contract = RegistryContract::new();

        let exec = contract
            .execute(&ctx(), &abi::encode_register(registration()))
            .unwrap();
        assert_eq!(exec.records_written, 1);
        assert!(exec.output.is_empty());

        let count = contract.execute(&ctx(), &abi::encode_record_count()).unwrap();
        assert_eq!(abi::decode_count(&count.output).unwrap(), 1);
        assert_eq!(count.records_written, 0);

        let registered = contract
            .execute(&ctx(), &abi::encode_is_registered("test_hash_123"))
            .unwrap();
        assert!(abi::decode_bool(&registered.output).unwrap());

        let verified = contract
            .execute(&ctx(), &abi::encode_verify("test_hash_123"))
            .unwrap();
        let verification = abi::decode_verification(&verified.output).unwrap();
        assert_eq!(verification.name, "Test User");
        assert!(verification.is_verified);
    }

    #[test]
    fn test_duplicate_reverts_with_reason() {
        let mut contract = RegistryContract::new();
        let data = abi::encode_register(registration());
        contract.execute(&ctx(), &data).unwrap();

        let reverted = contract.execute(&ctx(), &data).unwrap_err();
        assert_eq!(reverted.reason, DUPLICATE_REASON);
        assert_eq!(abi::decode_revert(&reverted.data()).as_deref(), Some(DUPLICATE_REASON));
        assert_eq!(contract.registry().record_count(), 1);
    }

    #[test]
    fn test_simulate_does_not_persist() {
        let contract = RegistryContract::new();
        let exec = contract
            .simulate(&ctx(), &abi::encode_register(registration()))
            .unwrap();
        assert_eq!(exec.records_written, 1);
        assert_eq!(contract.registry().record_count(), 0);
    }

    #[test]
    fn test_unknown_selector_reverts() {
        let mut contract = RegistryContract::new();
        let reverted = contract.execute(&ctx(), &[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert_eq!(reverted.reason, "unknown function selector");

        let reverted = contract.execute(&ctx(), &[]).unwrap_err();
        assert_eq!(reverted.reason, "unknown function selector");
    }

    #[test]
    fn test_verify_missing_reverts() {
        let contract = RegistryContract::new();
        let reverted = contract
            .simulate(&ctx(), &abi::encode_verify("missing"))
            .unwrap_err();
        assert_eq!(reverted.reason, "Aadhaar not registered");
    }
}
