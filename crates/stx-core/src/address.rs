use std::{
    fmt::{
        self,
        Display,
        Formatter,
    },
    str::FromStr,
};

use ripemd::Ripemd160;
use sha2::{
    Digest as _,
    Sha256,
};

use crate::c32;

pub const HASH160_LEN: usize = 20;

/// Address version of a single-signature account on mainnet (`SP...`).
pub const MAINNET_SINGLESIG: u8 = 22;
/// Address version of a single-signature account on testnet and devnet (`ST...`).
pub const TESTNET_SINGLESIG: u8 = 26;
/// Address version of a multi-signature account on mainnet (`SM...`).
pub const MAINNET_MULTISIG: u8 = 20;
/// Address version of a multi-signature account on testnet and devnet (`SN...`).
pub const TESTNET_MULTISIG: u8 = 21;

/// `RIPEMD160(SHA256(bytes))`.
#[must_use]
pub fn hash160(bytes: &[u8]) -> [u8; HASH160_LEN] {
    Ripemd160::digest(Sha256::digest(bytes)).into()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    fn c32(source: c32::Error) -> Self {
        Self(ErrorKind::C32(source))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
enum ErrorKind {
    #[error("addresses must start with `S`, but got `{0}`")]
    BadPrefix(String),
    #[error("address is too short")]
    TooShort,
    #[error("address hash must be {HASH160_LEN} bytes, but got {0}")]
    BadHashLength(usize),
    #[error("failed decoding c32check address")]
    C32(#[source] c32::Error),
}

/// A ledger account address: a version byte and the hash160 of the account's public key.
///
/// Displayed and parsed in c32check form, e.g. `ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Address {
    version: u8,
    hash160: [u8; HASH160_LEN],
}

impl Address {
    /// Constructs an address from its parts.
    ///
    /// # Errors
    /// Returns an error if `version` cannot be represented as a c32 character (>= 32).
    pub fn try_new(version: u8, hash160: [u8; HASH160_LEN]) -> Result<Self, Error> {
        c32::version_char(version).map_err(Error::c32)?;
        Ok(Self {
            version,
            hash160,
        })
    }

    /// Derives the single-signature address of a SEC1-encoded public key.
    ///
    /// # Errors
    /// Returns an error under the same conditions as [`Address::try_new`].
    pub fn from_public_key(version: u8, public_key: &[u8]) -> Result<Self, Error> {
        Self::try_new(version, hash160(public_key))
    }

    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    #[must_use]
    pub fn hash160(&self) -> &[u8; HASH160_LEN] {
        &self.hash160
    }

    /// Returns true if the version denotes a mainnet account.
    #[must_use]
    pub fn is_mainnet(&self) -> bool {
        matches!(self.version, MAINNET_SINGLESIG | MAINNET_MULTISIG)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // the version is checked on construction
        let version = c32::version_char(self.version).map_err(|_| fmt::Error)?;
        write!(
            f,
            "S{version}{}",
            c32::check_encode(self.version, &self.hash160)
        )
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match chars.next() {
            Some('S') => {}
            _ => return Err(Error(ErrorKind::BadPrefix(s.chars().take(1).collect()))),
        }
        let version_char = chars.next().ok_or(Error(ErrorKind::TooShort))?;
        let version = c32::version_from_char(version_char).map_err(Error::c32)?;
        let bytes = c32::check_decode(version, chars.as_str()).map_err(Error::c32)?;
        let hash160: [u8; HASH160_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error(ErrorKind::BadHashLength(bytes.len())))?;
        Self::try_new(version, hash160)
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_addresses_match_the_boot_addresses() {
        let mainnet = Address::try_new(MAINNET_SINGLESIG, [0; HASH160_LEN]).unwrap();
        let testnet = Address::try_new(TESTNET_SINGLESIG, [0; HASH160_LEN]).unwrap();
        assert_eq!("SP000000000000000000002Q6VF78", mainnet.to_string());
        assert_eq!("ST000000000000000000002AMW42H", testnet.to_string());
    }

    #[test]
    fn parse_inverts_display() {
        let hash = hash160(b"some public key");
        for version in [MAINNET_SINGLESIG, TESTNET_SINGLESIG, MAINNET_MULTISIG] {
            let address = Address::try_new(version, hash).unwrap();
            let parsed: Address = address.to_string().parse().unwrap();
            assert_eq!(address, parsed);
        }
    }

    #[test]
    fn well_known_testnet_address_parses() {
        let address: Address = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".parse().unwrap();
        assert_eq!(TESTNET_SINGLESIG, address.version());
        assert!(!address.is_mainnet());
        assert_eq!(
            "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM",
            address.to_string()
        );
    }

    #[test]
    fn same_hash_renders_differently_per_network() {
        let hash = hash160(b"key");
        let mainnet = Address::try_new(MAINNET_SINGLESIG, hash).unwrap().to_string();
        let testnet = Address::try_new(TESTNET_SINGLESIG, hash).unwrap().to_string();
        assert!(mainnet.starts_with("SP"));
        assert!(testnet.starts_with("ST"));
        assert_ne!(mainnet[2..], testnet[2..]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("XP000000000000000000002Q6VF78".parse::<Address>().is_err());
        assert!("S".parse::<Address>().is_err());
        assert!("SP000000000000000000002Q6VF79".parse::<Address>().is_err());
        assert!("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGN".parse::<Address>().is_err());
    }
}
