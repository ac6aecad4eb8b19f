//! Local transaction signing for endpoints without node-managed accounts.

use crate::error::LedgerError;
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;

/// Signs transactions with a key held in process memory.
///
/// `Debug` only ever shows the address.
#[derive(Clone)]
pub struct TransactionSigner {
    inner: PrivateKeySigner,
}

impl TransactionSigner {
    /// Signer from a hex private key (with or without `0x`).
    pub fn from_private_key(key: &SecretString) -> Result<Self, LedgerError> {
        let key = key.expose_secret().trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let inner = PrivateKeySigner::from_str(key)
            .map_err(|e| LedgerError::Signing(format!("invalid private key: {}", e)))?;
        Ok(Self { inner })
    }

    /// Signer for account `index` of a BIP-39 mnemonic (path m/44'/60'/0'/0/index).
    pub fn from_mnemonic(phrase: &SecretString, index: u32) -> Result<Self, LedgerError> {
        let inner = MnemonicBuilder::<English>::default()
            .phrase(phrase.expose_secret().trim())
            .index(index)
            .map_err(|e| LedgerError::Signing(format!("invalid derivation index: {}", e)))?
            .build()
            .map_err(|e| LedgerError::Signing(format!("invalid mnemonic: {}", e)))?;
        Ok(Self { inner })
    }

    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// Wallet that signs every transaction sent from [`Self::address`].
    pub fn into_wallet(self) -> EthereumWallet {
        EthereumWallet::from(self.inner)
    }
}

impl fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("address", &self.address())
            .finish()
    }
}
