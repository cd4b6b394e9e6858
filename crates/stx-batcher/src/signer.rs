use std::fmt::{
    self,
    Debug,
    Formatter,
};

use bip32::{
    DerivationPath,
    XPrv,
};
use bip39::{
    Language,
    Mnemonic,
    Seed,
};
use secrecy::ExposeSecret as _;
use stx_core::{
    Address,
    Network,
    SigningKey,
};
use zeroize::Zeroizing;

use crate::credential::Credential;

/// Derivation path of the first account of a ledger wallet.
pub const DERIVATION_PATH: &str = "m/44'/5757'/0'/0/0";

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("failed deriving a signing key from the mnemonic: {0}")]
    KeyDerivation(String),
    #[error("credential does not hold a usable secp256k1 key")]
    InvalidKey(#[source] stx_core::crypto::Error),
    #[error("failed constructing the sender address")]
    Address(#[source] stx_core::address::Error),
}

/// The sender of a batch: a signing key and the account address it controls on one network.
pub struct Signer {
    signing_key: SigningKey,
    address: Address,
    network: Network,
}

impl Signer {
    /// Derives the signing key from `credential` and its address on `network`.
    ///
    /// The same credential and network always yield the same key and address. Keys derived
    /// from a mnemonic use a compressed public key.
    ///
    /// # Errors
    /// Returns [`SignerError::KeyDerivation`] if the phrase is not a valid English BIP-39
    /// mnemonic, and [`SignerError::InvalidKey`] if the resulting secret is not a valid key.
    pub fn derive(credential: &Credential, network: Network) -> Result<Self, SignerError> {
        let signing_key = match credential {
            Credential::Mnemonic(phrase) => from_mnemonic(phrase.expose_secret())?,
            Credential::RawKey(hex) => {
                SigningKey::from_hex(hex.expose_secret()).map_err(SignerError::InvalidKey)?
            }
        };
        let address = signing_key
            .address(network.singlesig_address_version())
            .map_err(SignerError::Address)?;
        Ok(Self {
            signing_key,
            address,
            network,
        })
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn network(&self) -> Network {
        self.network
    }

    #[must_use]
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl Debug for Signer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address.to_string())
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

fn from_mnemonic(phrase: &str) -> Result<SigningKey, SignerError> {
    let mnemonic = Mnemonic::from_phrase(phrase, Language::English)
        .map_err(|e| SignerError::KeyDerivation(e.to_string()))?;
    let seed = Seed::new(&mnemonic, "");
    let path: DerivationPath = DERIVATION_PATH
        .parse()
        .map_err(|e: bip32::Error| SignerError::KeyDerivation(e.to_string()))?;
    let xprv = XPrv::derive_from_path(seed.as_bytes(), &path)
        .map_err(|e| SignerError::KeyDerivation(e.to_string()))?;
    let secret: Zeroizing<[u8; 32]> = Zeroizing::new(xprv.private_key().to_bytes().into());
    SigningKey::from_bytes(&secret, true).map_err(SignerError::InvalidKey)
}
