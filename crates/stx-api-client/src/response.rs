use std::fmt::{
    self,
    Display,
    Formatter,
};

use reqwest::StatusCode;
use stx_core::TxId;

/// Nonce information of an account as tracked by the API.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct NonceResponse {
    /// The nonce the account's next transaction should use.
    pub possible_next_nonce: u64,
    #[serde(default)]
    pub last_executed_tx_nonce: Option<u64>,
    #[serde(default)]
    pub last_mempool_tx_nonce: Option<u64>,
    /// Nonces below the mempool tip that no transaction has used yet.
    #[serde(default)]
    pub detected_missing_nonces: Vec<u64>,
}

/// What the node did with a broadcast transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BroadcastResponse {
    Accepted(TxId),
    Rejected(Rejection),
}

/// A node's refusal to admit a transaction to its mempool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub reason: RejectionReason,
    /// The node's human readable error message.
    pub error: String,
    pub reason_data: Option<serde_json::Value>,
    pub txid: Option<String>,
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.error)?;
        if let Some(data) = &self.reason_data {
            write!(f, " ({data})")?;
        }
        Ok(())
    }
}

/// Why a node rejected a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    BadNonce,
    ConflictingNonceInMempool,
    NotEnoughFunds,
    FeeTooLow,
    NoSuchContract,
    NoSuchPublicFunction,
    BadFunctionArgument,
    Other(String),
}

impl RejectionReason {
    fn from_node(reason: &str) -> Self {
        match reason {
            "BadNonce" => Self::BadNonce,
            "ConflictingNonceInMempool" => Self::ConflictingNonceInMempool,
            "NotEnoughFunds" => Self::NotEnoughFunds,
            "FeeTooLow" => Self::FeeTooLow,
            "NoSuchContract" => Self::NoSuchContract,
            "NoSuchPublicFunction" => Self::NoSuchPublicFunction,
            "BadFunctionArgument" => Self::BadFunctionArgument,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns true if the rejection means the nonce used was not the account's next one.
    #[must_use]
    pub fn is_nonce_related(&self) -> bool {
        matches!(self, Self::BadNonce | Self::ConflictingNonceInMempool)
    }
}

impl Display for RejectionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadNonce => f.write_str("BadNonce"),
            Self::ConflictingNonceInMempool => f.write_str("ConflictingNonceInMempool"),
            Self::NotEnoughFunds => f.write_str("NotEnoughFunds"),
            Self::FeeTooLow => f.write_str("FeeTooLow"),
            Self::NoSuchContract => f.write_str("NoSuchContract"),
            Self::NoSuchPublicFunction => f.write_str("NoSuchPublicFunction"),
            Self::BadFunctionArgument => f.write_str("BadFunctionArgument"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

#[derive(serde::Deserialize)]
struct RawRejection {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    reason_data: Option<serde_json::Value>,
    #[serde(default)]
    txid: Option<String>,
}

impl Rejection {
    /// Interprets the body of a non-success broadcast response.
    ///
    /// Bodies that are not the node's JSON error object are kept verbatim in
    /// [`RejectionReason::Other`].
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<RawRejection>(body) {
            Ok(raw) => {
                let reason = raw.reason.as_deref().map_or_else(
                    || RejectionReason::Other(format!("HTTP {status}")),
                    RejectionReason::from_node,
                );
                Self {
                    status,
                    reason,
                    error: raw.error,
                    reason_data: raw.reason_data,
                    txid: raw.txid,
                }
            }
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                Self {
                    status,
                    reason: RejectionReason::Other(format!("HTTP {status}: {text}")),
                    error: text,
                    reason_data: None,
                    txid: None,
                }
            }
        }
    }
}
