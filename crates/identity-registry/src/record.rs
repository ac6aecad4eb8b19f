//! Identity records and the values the registry hands back.

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields supplied by a caller registering an identity.
///
/// Every field is an opaque string; hashes and the encrypted payload are
/// produced off-chain and never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Hash of the Aadhaar number; the unique registry key
    pub identity_hash: String,
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address_hash: String,
    pub encrypted_payload: String,
}

impl Registration {
    pub fn new(
        identity_hash: impl Into<String>,
        name: impl Into<String>,
        date_of_birth: impl Into<String>,
        gender: impl Into<String>,
        address_hash: impl Into<String>,
        encrypted_payload: impl Into<String>,
    ) -> Self {
        Self {
            identity_hash: identity_hash.into(),
            name: name.into(),
            date_of_birth: date_of_birth.into(),
            gender: gender.into(),
            address_hash: address_hash.into(),
            encrypted_payload: encrypted_payload.into(),
        }
    }
}

/// Where and when a registration was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Transaction sender
    pub sender: Address,
    /// Block the transaction is included in
    pub block_number: u64,
    /// Block timestamp
    pub timestamp: DateTime<Utc>,
}

impl CallContext {
    pub fn new(sender: Address, block_number: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender,
            block_number,
            timestamp,
        }
    }
}

/// A stored identity record. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub identity_hash: String,
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address_hash: String,
    pub encrypted_payload: String,
    /// Always true for a stored record
    pub is_verified: bool,
    /// Account that submitted the registration
    pub registered_by: Address,
    pub registered_at_block: u64,
    pub registered_at: DateTime<Utc>,
}

impl Record {
    /// Build the stored form of a registration.
    pub fn from_registration(registration: Registration, ctx: &CallContext) -> Self {
        Self {
            identity_hash: registration.identity_hash,
            name: registration.name,
            date_of_birth: registration.date_of_birth,
            gender: registration.gender,
            address_hash: registration.address_hash,
            encrypted_payload: registration.encrypted_payload,
            is_verified: true,
            registered_by: ctx.sender,
            registered_at_block: ctx.block_number,
            registered_at: ctx.timestamp,
        }
    }

    /// The subset of the record exposed by `verify`.
    pub fn verification(&self) -> Verification {
        Verification {
            name: self.name.clone(),
            date_of_birth: self.date_of_birth.clone(),
            gender: self.gender.clone(),
            is_verified: self.is_verified,
        }
    }
}

/// Result of verifying a registered identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub is_verified: bool,
}
