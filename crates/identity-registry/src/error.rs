//! Registry error types.

use thiserror::Error;

/// Revert reason for a second registration of the same identity hash.
pub const DUPLICATE_REASON: &str = "Aadhaar already registered";

/// Revert reason for verifying an identity hash that was never registered.
pub const NOT_FOUND_REASON: &str = "Aadhaar not registered";

/// Errors raised by registry operations.
///
/// The display strings double as the contract's revert reasons, so a
/// caller on the far side of a ledger sees the same message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Aadhaar already registered: {0}")]
    DuplicateIdentity(String),

    #[error("Aadhaar not registered: {0}")]
    RecordNotFound(String),
}

impl RegistryError {
    /// The revert reason the contract reports for this error.
    pub fn revert_reason(&self) -> &'static str {
        match self {
            RegistryError::DuplicateIdentity(_) => DUPLICATE_REASON,
            RegistryError::RecordNotFound(_) => NOT_FOUND_REASON,
        }
    }

    /// Map a revert reason reported by a ledger back to a registry error.
    ///
    /// Returns `None` when the reason did not originate from the registry.
    pub fn from_revert_reason(reason: &str, identity_hash: &str) -> Option<Self> {
        if reason.contains(DUPLICATE_REASON) {
            Some(RegistryError::DuplicateIdentity(identity_hash.to_string()))
        } else if reason.contains(NOT_FOUND_REASON) {
            Some(RegistryError::RecordNotFound(identity_hash.to_string()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message_mentions_already_registered() {
        let err = RegistryError::DuplicateIdentity("abc".into());
        assert!(err.to_string().contains("already registered"));
        assert_eq!(err.revert_reason(), DUPLICATE_REASON);
    }

    #[test]
    fn test_from_revert_reason() {
        assert_eq!(
            RegistryError::from_revert_reason(
                "VM Exception while processing transaction: revert Aadhaar already registered",
                "h1"
            ),
            Some(RegistryError::DuplicateIdentity("h1".into()))
        );
        assert_eq!(
            RegistryError::from_revert_reason("Aadhaar not registered", "h2"),
            Some(RegistryError::RecordNotFound("h2".into()))
        );
        assert_eq!(RegistryError::from_revert_reason("out of gas", "h3"), None);
    }
}
