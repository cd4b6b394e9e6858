use std::time::Duration;

use figment::{
    providers::Env,
    Figment,
};
use secrecy::{
    ExposeSecret as _,
    SecretString,
};
use serde::{
    Deserialize,
    Serialize,
    Serializer,
};
use stx_core::Network;

use crate::catalog::Catalog;

/// Prefix of the tuning variables read by the batcher, e.g. `BATCH_CYCLES`.
pub const PREFIX: &str = "BATCH_";

/// Variables read without a prefix, under the names operators already use for them.
const UNPREFIXED: &[&str] = &[
    "SENDER_PRIVATE_KEY",
    "STACKS_NETWORK",
    "CONTRACT_ADDRESS",
    "TEST_RECIPIENT",
];

/// The complete configuration of a batch run.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// A 12 or 24 word mnemonic, or a 64/66 character hex secret key.
    #[serde(serialize_with = "serialize_private_key")]
    pub sender_private_key: SecretString,

    /// One of `mainnet`, `testnet` or `devnet`.
    #[serde(default)]
    pub stacks_network: Network,

    /// `ADDRESS.NAME` or a bare `ADDRESS`; a bare address uses the catalog's contract name.
    #[serde(default = "default_contract_address")]
    pub contract_address: String,

    /// Recipient principal for operations that transfer to someone; defaults to the sender.
    #[serde(default)]
    pub test_recipient: Option<String>,

    /// Which built-in operation catalog to run.
    #[serde(default)]
    pub contract: Catalog,

    #[serde(default = "default_cycles")]
    pub cycles: u32,

    /// Pause between two consecutive operations, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Fee per transaction in micro-STX. Defaults per network.
    #[serde(default)]
    pub fee: Option<u64>,

    /// Root of the ledger API. Defaults per network.
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default = "default_nonce_fetch_attempts")]
    pub nonce_fetch_attempts: u32,

    #[serde(default = "default_nonce_fetch_delay_ms")]
    pub nonce_fetch_delay_ms: u64,

    /// Forces human readable logs even when stderr is not a tty.
    #[serde(default)]
    pub force_stdout: bool,

    /// Log filter directives, read from `RUST_LOG`.
    #[serde(default = "default_log")]
    pub log: String,
}

pub const DEFAULT_CONTRACT_ADDRESS: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";

fn default_contract_address() -> String {
    DEFAULT_CONTRACT_ADDRESS.to_string()
}

fn default_cycles() -> u32 {
    10
}

fn default_delay_ms() -> u64 {
    1_000
}

fn default_nonce_fetch_attempts() -> u32 {
    3
}

fn default_nonce_fetch_delay_ms() -> u64 {
    2_000
}

fn default_log() -> String {
    "info".to_string()
}

fn serialize_private_key<S>(key: &SecretString, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let masked: String = key
        .expose_secret()
        .chars()
        .enumerate()
        .map(|(i, c)| if i < 4 { c } else { '#' })
        .collect();
    s.serialize_str(&masked)
}

impl Config {
    /// Reads the config from the process environment.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing, a variable does not parse, or
    /// an unknown `BATCH_` variable is set.
    pub fn get() -> Result<Self, figment::Error> {
        Self::get_with_prefix(PREFIX)
    }

    pub(crate) fn get_with_prefix(prefix: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::prefixed("RUST_").split("_").only(&["log"]))
            .merge(Env::raw().only(UNPREFIXED))
            .merge(Env::prefixed(prefix))
            .extract()
    }

    #[must_use]
    pub fn fee(&self) -> u64 {
        self.fee
            .unwrap_or_else(|| self.stacks_network.default_fee())
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.stacks_network.default_api_base())
    }

    /// The recipient principal, unless unset or empty.
    #[must_use]
    pub fn test_recipient(&self) -> Option<&str> {
        self.test_recipient
            .as_deref()
            .map(str::trim)
            .filter(|recipient| !recipient.is_empty())
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    #[must_use]
    pub fn nonce_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.nonce_fetch_delay_ms)
    }
}
