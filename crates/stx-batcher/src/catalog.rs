//! The operations a batch submits, per cycle.
use std::{
    fmt::{
        self,
        Display,
        Formatter,
    },
    str::FromStr,
};

use stx_core::{
    contract,
    Address,
    ClarityValue,
    ContractName,
    FunctionName,
};

/// One contract call: the function and its ordered arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationSpec {
    pub function: FunctionName,
    pub args: Vec<ClarityValue>,
}

impl OperationSpec {
    /// # Errors
    /// Returns an error if `function` is not a valid Clarity function name.
    pub fn new(function: &str, args: Vec<ClarityValue>) -> Result<Self, contract::Error> {
        Ok(Self {
            function: function.parse()?,
            args,
        })
    }
}

impl Display for OperationSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.function)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        f.write_str(")")
    }
}

/// The ordered operations of each cycle of a run.
///
/// Every cycle has the same number of operations; only their arguments may depend on the
/// cycle.
pub trait OperationPlan {
    fn operations(&self, cycle: u32) -> Vec<OperationSpec>;
}

/// The same operations in every cycle.
impl OperationPlan for Vec<OperationSpec> {
    fn operations(&self, _cycle: u32) -> Vec<OperationSpec> {
        self.clone()
    }
}

/// The principals the built-in catalogs pass as arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanContext {
    pub sender: Address,
    pub recipient: Address,
}

/// The built-in operation catalogs, one per supported contract.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Catalog {
    #[default]
    AccBoundedToken,
    NftAuthorization,
    DiversifiedRoyaltyNft,
    AccountAbstraction,
    #[serde(rename = "royalty-bearing-non-fungible-token")]
    RoyaltyBearingNft,
    #[serde(rename = "rental-non-fungible-token")]
    RentalNft,
    SwapCore,
}

impl Catalog {
    pub const ALL: [Self; 7] = [
        Self::AccBoundedToken,
        Self::NftAuthorization,
        Self::DiversifiedRoyaltyNft,
        Self::AccountAbstraction,
        Self::RoyaltyBearingNft,
        Self::RentalNft,
        Self::SwapCore,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccBoundedToken => "acc-bounded-token",
            Self::NftAuthorization => "nft-authorization",
            Self::DiversifiedRoyaltyNft => "diversified-royalty-nft",
            Self::AccountAbstraction => "account-abstraction",
            Self::RoyaltyBearingNft => "royalty-bearing-non-fungible-token",
            Self::RentalNft => "rental-non-fungible-token",
            Self::SwapCore => "swap-core",
        }
    }

    /// The contract name used when only a contract address is configured.
    ///
    /// # Errors
    /// Never fails for the built-in catalogs; the names are valid contract names.
    pub fn default_contract_name(self) -> Result<ContractName, contract::Error> {
        self.as_str().parse()
    }

    fn functions(self) -> &'static [&'static str] {
        match self {
            Self::AccBoundedToken => &["give", "take", "unequip", "transfer"],
            Self::NftAuthorization => &[
                "mint",
                "transfer",
                "authorize-user",
                "authorize-user-with-rights",
                "transfer-user-rights",
                "extend-duration",
                "update-user-rights",
                "update-user-limit",
                "update-reset-allowed",
                "reset-user",
            ],
            Self::DiversifiedRoyaltyNft => &[
                "mint",
                "transfer",
                "list-item",
                "delist-item",
                "buy-item",
                "set-royalty",
            ],
            Self::AccountAbstraction => &[
                "create-account",
                "deposit-to",
                "withdraw-to",
                "register-paymaster",
                "add-paymaster-deposit",
                "unlock-paymaster-stake",
                "withdraw-paymaster-stake",
                "validate-paymaster-op",
                "update-account-key",
                "deactivate-account",
                "reactivate-account",
                "set-entry-point-status",
                "set-asset-restrictions",
                "validate-user-op",
                "handle-op",
            ],
            Self::RoyaltyBearingNft => &["set-platform-fee-rate"],
            Self::RentalNft => &["mint"],
            Self::SwapCore => &["set-fee-to"],
        }
    }

    /// Validates the catalog's function names and binds it to the run's principals.
    ///
    /// # Errors
    /// Returns an error if a function name of the catalog is not a valid Clarity name.
    pub fn plan(self, context: PlanContext) -> Result<CatalogPlan, contract::Error> {
        let functions = self
            .functions()
            .iter()
            .map(|name| name.parse::<FunctionName>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CatalogPlan {
            catalog: self,
            functions,
            context,
        })
    }

    fn arguments(self, function: &str, cycle: u32, ctx: &PlanContext) -> Vec<ClarityValue> {
        let sender = || ClarityValue::principal(ctx.sender);
        let recipient = || ClarityValue::principal(ctx.recipient);
        let token_id = || ClarityValue::uint(u64::from(cycle) + 1);
        let uint = |v: u64| ClarityValue::uint(v);
        match (self, function) {
            (Self::AccBoundedToken, "give" | "take") => vec![
                sender(),
                ClarityValue::buffer(vec![0u8; 256]),
                ClarityValue::buffer(vec![0u8; 64]),
                ascii("ipfs://token1"),
            ],
            (Self::AccBoundedToken, "unequip") => vec![token_id()],
            (Self::AccBoundedToken, "transfer") => vec![token_id(), sender(), sender()],

            (Self::NftAuthorization, "mint") => vec![
                sender(),
                ascii(&format!("https://example.com/nft/{cycle}")),
                uint(1000),
            ],
            (Self::NftAuthorization, "transfer" | "transfer-user-rights") => {
                vec![token_id(), sender(), sender()]
            }
            (Self::NftAuthorization, "authorize-user") => vec![token_id(), sender(), uint(100)],
            (Self::NftAuthorization, "authorize-user-with-rights") => {
                vec![token_id(), sender(), uint(100), uint(500)]
            }
            (Self::NftAuthorization, "extend-duration") => vec![token_id(), sender(), uint(50)],
            (Self::NftAuthorization, "update-user-rights") => vec![token_id(), sender(), uint(800)],
            (Self::NftAuthorization, "update-user-limit") => vec![token_id(), uint(10)],
            (Self::NftAuthorization, "update-reset-allowed") => vec![token_id()],
            (Self::NftAuthorization, "reset-user") => vec![token_id(), sender()],

            (Self::DiversifiedRoyaltyNft, "mint") => vec![recipient(), ascii("ipfs://test-uri")],
            (Self::DiversifiedRoyaltyNft, "transfer") => vec![uint(1), sender(), recipient()],
            (Self::DiversifiedRoyaltyNft, "list-item") => vec![
                uint(1),
                uint(1_000_000),
                uint(999_999_999),
                ClarityValue::none(),
            ],
            (Self::DiversifiedRoyaltyNft, "delist-item") => vec![uint(1)],
            (Self::DiversifiedRoyaltyNft, "buy-item") => {
                vec![uint(1), uint(1_000_000), ClarityValue::none()]
            }
            (Self::DiversifiedRoyaltyNft, "set-royalty") => vec![recipient(), uint(250)],

            (Self::AccountAbstraction, "create-account" | "update-account-key") => {
                vec![sample_public_key()]
            }
            (Self::AccountAbstraction, "deposit-to") => vec![sender(), uint(1_000_000)],
            (Self::AccountAbstraction, "withdraw-to") => vec![recipient(), uint(100)],
            (Self::AccountAbstraction, "register-paymaster") => {
                vec![uint(1_000_000), uint(86_400)]
            }
            (Self::AccountAbstraction, "add-paymaster-deposit") => vec![uint(500_000)],
            (Self::AccountAbstraction, "withdraw-paymaster-stake") => vec![recipient()],
            (Self::AccountAbstraction, "validate-paymaster-op") => {
                vec![sender(), recipient(), uint(1000)]
            }
            (Self::AccountAbstraction, "set-entry-point-status") => vec![ClarityValue::Bool(true)],
            (Self::AccountAbstraction, "set-asset-restrictions") => {
                vec![ClarityValue::Bool(false)]
            }
            (Self::AccountAbstraction, "validate-user-op") => {
                let mut args = user_op(sender());
                args.extend([uint(0), uint(9_999_999_999)]);
                args
            }
            (Self::AccountAbstraction, "handle-op") => {
                let mut args = user_op(sender());
                args.extend([
                    uint(0),
                    uint(9_999_999_999),
                    uint(1000),
                    uint(1000),
                    uint(1000),
                ]);
                args
            }

            (Self::RoyaltyBearingNft, "set-platform-fee-rate") => {
                // basis points, cycling through 100..=1000
                vec![uint(100 + u64::from(cycle % 901))]
            }

            (Self::RentalNft, "mint") => {
                let n = u64::from(cycle) + 1;
                vec![
                    recipient(),
                    ascii(&format!("https://api.bitto.io/rental-nft/metadata/{n}.json")),
                    ascii(&format!("Bitto Rental NFT #{n}")),
                    ClarityValue::string_utf8(format!(
                        "A rentable NFT from Bitto collection - Token #{n}"
                    )),
                ]
            }

            (Self::SwapCore, "set-fee-to") => {
                if cycle % 2 == 0 {
                    vec![ClarityValue::some(sender())]
                } else {
                    vec![ClarityValue::none()]
                }
            }

            _ => vec![],
        }
    }
}

// the catalogs only build ASCII strings
fn ascii(s: &str) -> ClarityValue {
    ClarityValue::StringAscii(s.to_string())
}

fn sample_public_key() -> ClarityValue {
    ClarityValue::buffer(vec![0x02u8; 33])
}

/// `sender, nonce 0, signature, message hash`: the leading arguments of a user operation.
fn user_op(sender: ClarityValue) -> Vec<ClarityValue> {
    vec![
        sender,
        ClarityValue::uint(0u8),
        ClarityValue::buffer(vec![0xcdu8; 64]),
        ClarityValue::buffer(vec![0xabu8; 32]),
    ]
}

impl Display for Catalog {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown catalog `{0}`")]
pub struct UnknownCatalog(String);

impl FromStr for Catalog {
    type Err = UnknownCatalog;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|catalog| catalog.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCatalog(s.to_string()))
    }
}

impl<'de> serde::Deserialize<'de> for Catalog {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A catalog bound to the principals of a run.
#[derive(Clone, Debug)]
pub struct CatalogPlan {
    catalog: Catalog,
    functions: Vec<FunctionName>,
    context: PlanContext,
}

impl CatalogPlan {
    #[must_use]
    pub fn catalog(&self) -> Catalog {
        self.catalog
    }
}

impl OperationPlan for CatalogPlan {
    fn operations(&self, cycle: u32) -> Vec<OperationSpec> {
        self.functions
            .iter()
            .map(|function| OperationSpec {
                function: function.clone(),
                args: self
                    .catalog
                    .arguments(function.as_str(), cycle, &self.context),
            })
            .collect()
    }
}
