use std::{
    fmt::{
        self,
        Display,
        Formatter,
    },
    str::FromStr,
};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::address::{
    self,
    Address,
};

pub const MAX_CONTRACT_NAME_LEN: usize = 40;
pub const MAX_CLARITY_NAME_LEN: usize = 128;
pub const MAX_FUNCTION_NAME_LEN: usize = MAX_CLARITY_NAME_LEN;

static CONTRACT_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]([a-zA-Z0-9]|[-_])*$").expect("regex is valid"));

static CLARITY_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z]|[-!?+<>=/*])([a-zA-Z0-9]|[-_!?+<>=/*])*$").expect("regex is valid")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("contract name `{0}` must start with a letter and contain only letters, digits, `-` and `_`")]
    InvalidContractName(String),
    #[error("contract name must be 1 to {MAX_CONTRACT_NAME_LEN} characters, but got {0}")]
    ContractNameLength(usize),
    #[error("`{0}` is not a valid function name")]
    InvalidFunctionName(String),
    #[error("function name must be 1 to {MAX_FUNCTION_NAME_LEN} characters, but got {0}")]
    FunctionNameLength(usize),
    #[error("`{0}` is not a valid clarity name")]
    InvalidClarityName(String),
    #[error("clarity name must be 1 to {MAX_CLARITY_NAME_LEN} characters, but got {0}")]
    ClarityNameLength(usize),
    #[error("failed parsing contract address")]
    Address(#[from] address::Error),
}

/// The name part of a deployed contract's identifier.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ContractName(String);

impl ContractName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends the wire encoding: one length byte followed by the ASCII name.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        put_short_str(buf, &self.0);
    }
}

impl FromStr for ContractName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > MAX_CONTRACT_NAME_LEN {
            return Err(Error::ContractNameLength(s.len()));
        }
        if !CONTRACT_NAME_REGEX.is_match(s) {
            return Err(Error::InvalidContractName(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl Display for ContractName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The name of a public function in a contract.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct FunctionName(String);

impl FunctionName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        put_short_str(buf, &self.0);
    }
}

impl FromStr for FunctionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > MAX_FUNCTION_NAME_LEN {
            return Err(Error::FunctionNameLength(s.len()));
        }
        if !CLARITY_NAME_REGEX.is_match(s) {
            return Err(Error::InvalidFunctionName(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl Display for FunctionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A name bound in Clarity code, such as a tuple key.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClarityName(String);

impl ClarityName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        put_short_str(buf, &self.0);
    }
}

impl FromStr for ClarityName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > MAX_CLARITY_NAME_LEN {
            return Err(Error::ClarityNameLength(s.len()));
        }
        if !CLARITY_NAME_REGEX.is_match(s) {
            return Err(Error::InvalidClarityName(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl Display for ClarityName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "names are validated to be at most 128 bytes"
)]
fn put_short_str(buf: &mut Vec<u8>, s: &str) {
    buf.push(s.len() as u8);
    buf.extend_from_slice(s.as_bytes());
}

/// A deployed contract: `<address>.<name>`.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ContractIdentifier {
    pub address: Address,
    pub name: ContractName,
}

impl ContractIdentifier {
    #[must_use]
    pub fn new(address: Address, name: ContractName) -> Self {
        Self {
            address,
            name,
        }
    }

    /// Parses `ADDRESS.NAME`, or a bare `ADDRESS` (optionally with a trailing `.`), in which
    /// case `default_name` is used.
    ///
    /// # Errors
    /// Returns an error if the address is not a valid c32check address, or the name is not a
    /// valid contract name.
    pub fn parse_with_default(s: &str, default_name: &ContractName) -> Result<Self, Error> {
        let s = s.trim();
        let (address, name) = match s.split_once('.') {
            Some((address, name)) if !name.is_empty() => (address, name.parse()?),
            Some((address, _)) => (address, default_name.clone()),
            None => (s, default_name.clone()),
        };
        Ok(Self {
            address: address.parse()?,
            name,
        })
    }
}

impl Display for ContractIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}

impl FromStr for ContractIdentifier {
    type Err = Error;

    /// Parses a fully qualified `ADDRESS.NAME`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, name) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| Error::ContractNameLength(0))?;
        Ok(Self {
            address: address.parse()?,
            name: name.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";

    fn default_name() -> ContractName {
        "acc-bounded-token".parse().unwrap()
    }

    #[test]
    fn contract_names_follow_clarity_rules() {
        assert!("swap-core".parse::<ContractName>().is_ok());
        assert!("a_b-C9".parse::<ContractName>().is_ok());
        assert!("9lives".parse::<ContractName>().is_err());
        assert!("".parse::<ContractName>().is_err());
        assert!("has space".parse::<ContractName>().is_err());
        assert!("a".repeat(41).parse::<ContractName>().is_err());
    }

    #[test]
    fn function_names_allow_clarity_symbols() {
        for name in ["give", "authorize-user-with-rights", "is-ok?", "set!", "+"] {
            assert!(name.parse::<FunctionName>().is_ok(), "{name}");
        }
        assert!("".parse::<FunctionName>().is_err());
        assert!("1st".parse::<FunctionName>().is_err());
        assert!("has.dot".parse::<FunctionName>().is_err());
    }

    #[test]
    fn clarity_names_are_bounded() {
        assert!("amount".parse::<ClarityName>().is_ok());
        assert!("a".repeat(MAX_CLARITY_NAME_LEN).parse::<ClarityName>().is_ok());
        assert_eq!(
            Err(Error::ClarityNameLength(256)),
            "a".repeat(256).parse::<ClarityName>()
        );
        assert!("two words".parse::<ClarityName>().is_err());
    }

    #[test]
    fn qualified_identifier_keeps_its_name() {
        let id =
            ContractIdentifier::parse_with_default(&format!("{DEPLOYER}.swap-core"), &default_name())
                .unwrap();
        assert_eq!("swap-core", id.name.as_str());
        assert_eq!(DEPLOYER, id.address.to_string());
        assert_eq!(format!("{DEPLOYER}.swap-core"), id.to_string());
    }

    #[test]
    fn bare_address_uses_default_name() {
        for input in [DEPLOYER.to_string(), format!("{DEPLOYER}."), format!("  {DEPLOYER} ")] {
            let id = ContractIdentifier::parse_with_default(&input, &default_name()).unwrap();
            assert_eq!(default_name(), id.name);
        }
    }

    #[test]
    fn invalid_address_is_rejected() {
        let err = ContractIdentifier::parse_with_default("ST123.foo", &default_name()).unwrap_err();
        assert!(matches!(err, Error::Address(_)));
    }

    #[test]
    fn from_str_requires_a_name() {
        assert!(DEPLOYER.parse::<ContractIdentifier>().is_err());
        assert!(format!("{DEPLOYER}.swap-core")
            .parse::<ContractIdentifier>()
            .is_ok());
    }
}
