use std::{
    fmt::{
        self,
        Display,
        Formatter,
    },
    str::FromStr,
};

use crate::address;

/// The ledger network a run targets.
///
/// Selects address versions, transaction versions, chain ids and default endpoints.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Devnet,
}

impl Network {
    pub const MAINNET_CHAIN_ID: u32 = 0x0000_0001;
    pub const TESTNET_CHAIN_ID: u32 = 0x8000_0000;

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
        }
    }

    #[must_use]
    pub fn is_mainnet(self) -> bool {
        matches!(self, Self::Mainnet)
    }

    /// Address version of single-signature accounts on this network.
    #[must_use]
    pub fn singlesig_address_version(self) -> u8 {
        if self.is_mainnet() {
            address::MAINNET_SINGLESIG
        } else {
            address::TESTNET_SINGLESIG
        }
    }

    #[must_use]
    pub fn transaction_version(self) -> u8 {
        if self.is_mainnet() {
            0x00
        } else {
            0x80
        }
    }

    #[must_use]
    pub fn chain_id(self) -> u32 {
        if self.is_mainnet() {
            Self::MAINNET_CHAIN_ID
        } else {
            Self::TESTNET_CHAIN_ID
        }
    }

    /// The public API used when no explicit endpoint is configured.
    ///
    /// Devnet has no public endpoint and shares the testnet default; local devnets are
    /// expected to configure their own.
    #[must_use]
    pub fn default_api_base(self) -> &'static str {
        if self.is_mainnet() {
            "https://api.hiro.so"
        } else {
            "https://api.testnet.hiro.so"
        }
    }

    /// Flat per-operation fee in micro-STX.
    #[must_use]
    pub fn default_fee(self) -> u64 {
        if self.is_mainnet() {
            10_000
        } else {
            1_000
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown network `{0}`; expected one of `mainnet`, `testnet`, `devnet`")]
pub struct UnknownNetwork(String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Network {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
