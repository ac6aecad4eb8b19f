//! Aadhaar identity registry.
//!
//! Stores identity records keyed by an opaque identity hash and enforces
//! at-most-one registration per hash. The same state machine is exposed as
//! a contract through the Solidity-compatible ABI in [`abi`], so it can be
//! hosted by a ledger and called with ordinary EVM calldata.
//!
//! ```text
//! register(hash, ...) ──► duplicate? ──yes──► DuplicateIdentity (no state change)
//!                             │
//!                             no ──► insert record, count += 1
//! ```

pub mod abi;
pub mod contract;
pub mod error;
pub mod record;
pub mod registry;

pub use contract::{Execution, RegistryContract, Reverted};
pub use error::RegistryError;
pub use record::{CallContext, Record, Registration, Verification};
pub use registry::Registry;
