//! Contract interface of the registry.
//!
//! The Solidity-compatible ABI is declared once here; both the ledger-side
//! dispatcher and the off-chain client encode through these types.

use alloy::primitives::{Bytes, U256};
use alloy::sol;
use alloy::sol_types::{Revert, SolCall, SolError, SolValue};
use serde_json::{json, Value};

use crate::record::{Registration, Verification};

/// Name the contract is published under in compiled artifacts.
pub const CONTRACT_NAME: &str = "AadhaarVerification";

sol! {
    interface IAadhaarVerification {
        function registerAadhaar(
            string aadhaarHash,
            string name,
            string dob,
            string gender,
            string addressHash,
            string encryptedData
        ) external;

        function verifyAadhaar(string aadhaarHash)
            external
            view
            returns (string name, string dob, string gender, bool isVerified);

        function isAadhaarRegistered(string aadhaarHash) external view returns (bool);

        function getRecordCount() external view returns (uint256);
    }
}

pub use IAadhaarVerification::{
    getRecordCountCall, isAadhaarRegisteredCall, registerAadhaarCall, verifyAadhaarCall,
    IAadhaarVerificationCalls,
};

impl From<Registration> for registerAadhaarCall {
    fn from(r: Registration) -> Self {
        Self {
            aadhaarHash: r.identity_hash,
            name: r.name,
            dob: r.date_of_birth,
            gender: r.gender,
            addressHash: r.address_hash,
            encryptedData: r.encrypted_payload,
        }
    }
}

impl From<registerAadhaarCall> for Registration {
    fn from(c: registerAadhaarCall) -> Self {
        Self {
            identity_hash: c.aadhaarHash,
            name: c.name,
            date_of_birth: c.dob,
            gender: c.gender,
            address_hash: c.addressHash,
            encrypted_payload: c.encryptedData,
        }
    }
}

/// Calldata for `registerAadhaar`.
pub fn encode_register(registration: Registration) -> Bytes {
    registerAadhaarCall::from(registration).abi_encode().into()
}

/// Calldata for `verifyAadhaar`.
pub fn encode_verify(identity_hash: &str) -> Bytes {
    verifyAadhaarCall {
        aadhaarHash: identity_hash.to_string(),
    }
    .abi_encode()
    .into()
}

/// Calldata for `isAadhaarRegistered`.
pub fn encode_is_registered(identity_hash: &str) -> Bytes {
    isAadhaarRegisteredCall {
        aadhaarHash: identity_hash.to_string(),
    }
    .abi_encode()
    .into()
}

/// Calldata for `getRecordCount`.
pub fn encode_record_count() -> Bytes {
    getRecordCountCall {}.abi_encode().into()
}

/// Return data of `verifyAadhaar`.
pub fn encode_verification(v: &Verification) -> Bytes {
    (
        v.name.clone(),
        v.date_of_birth.clone(),
        v.gender.clone(),
        v.is_verified,
    )
        .abi_encode_params()
        .into()
}

pub fn decode_verification(data: &[u8]) -> Result<Verification, alloy::sol_types::Error> {
    let (name, date_of_birth, gender, is_verified) =
        <(String, String, String, bool)>::abi_decode_params(data)?;
    Ok(Verification {
        name,
        date_of_birth,
        gender,
        is_verified,
    })
}

pub fn encode_bool(value: bool) -> Bytes {
    value.abi_encode().into()
}

pub fn decode_bool(data: &[u8]) -> Result<bool, alloy::sol_types::Error> {
    bool::abi_decode(data)
}

pub fn encode_count(count: u64) -> Bytes {
    U256::from(count).abi_encode().into()
}

/// Decode a `uint256` count, saturating at `u64::MAX`.
pub fn decode_count(data: &[u8]) -> Result<u64, alloy::sol_types::Error> {
    let count = U256::abi_decode(data)?;
    Ok(u64::try_from(count).unwrap_or(u64::MAX))
}

/// Solidity `Error(string)` revert data.
pub fn encode_revert(reason: &str) -> Bytes {
    Revert {
        reason: reason.to_string(),
    }
    .abi_encode()
    .into()
}

/// Extract a human-readable reason from revert data, if there is one.
pub fn decode_revert(data: &[u8]) -> Option<String> {
    alloy::sol_types::decode_revert_reason(data)
}

fn string_param(name: &str) -> Value {
    json!({ "internalType": "string", "name": name, "type": "string" })
}

/// JSON interface description (ABI) of the registry contract.
///
/// This is the document persisted next to the deployed address for the
/// mobile client.
pub fn interface_description() -> Value {
    json!([
        {
            "inputs": [
                string_param("aadhaarHash"),
                string_param("name"),
                string_param("dob"),
                string_param("gender"),
                string_param("addressHash"),
                string_param("encryptedData"),
            ],
            "name": "registerAadhaar",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [string_param("aadhaarHash")],
            "name": "verifyAadhaar",
            "outputs": [
                string_param("name"),
                string_param("dob"),
                string_param("gender"),
                { "internalType": "bool", "name": "isVerified", "type": "bool" }
            ],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [string_param("aadhaarHash")],
            "name": "isAadhaarRegistered",
            "outputs": [{ "internalType": "bool", "name": "", "type": "bool" }],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "inputs": [],
            "name": "getRecordCount",
            "outputs": [{ "internalType": "uint256", "name": "", "type": "uint256" }],
            "stateMutability": "view",
            "type": "function"
        }
    ])
}
