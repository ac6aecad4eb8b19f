//! In-memory identity registry.

use crate::error::RegistryError;
use crate::record::{CallContext, Record, Registration, Verification};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Identity registry keyed by identity hash.
///
/// Records can only be added. The record count is the number of keys and
/// therefore never decreases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    /// Records indexed by identity hash
    records: HashMap<String, Record>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Register a new identity.
    ///
    /// Fails without touching any state if the identity hash is already
    /// present. Any string, including the empty one, is a valid key.
    pub fn register(
        &mut self,
        registration: Registration,
        ctx: &CallContext,
    ) -> Result<(), RegistryError> {
        if self.records.contains_key(&registration.identity_hash) {
            return Err(RegistryError::DuplicateIdentity(registration.identity_hash));
        }

        let key = registration.identity_hash.clone();
        let record = Record::from_registration(registration, ctx);
        self.records.insert(key.clone(), record);

        debug!(
            identity_hash = %key,
            block = ctx.block_number,
            count = self.records.len(),
            "Identity registered"
        );
        Ok(())
    }

    /// Verify a registered identity.
    pub fn verify(&self, identity_hash: &str) -> Result<Verification, RegistryError> {
        self.records
            .get(identity_hash)
            .map(Record::verification)
            .ok_or_else(|| RegistryError::RecordNotFound(identity_hash.to_string()))
    }

    /// Check if an identity hash is registered.
    pub fn is_registered(&self, identity_hash: &str) -> bool {
        self.records.contains_key(identity_hash)
    }

    /// Get the number of registered identities.
    pub fn record_count(&self) -> u64 {
        self.records.len() as u64
    }

    /// Get a full record by identity hash.
    pub fn get(&self, identity_hash: &str) -> Option<&Record> {
        self.records.get(identity_hash)
    }
}
