//! Turning one operation and one nonce into a broadcast transaction.
use std::{
    fmt::{
        self,
        Display,
        Formatter,
    },
    time::Duration,
};

use async_trait::async_trait;
use stx_api_client::{
    BroadcastResponse,
    HttpClient,
    Rejection,
};
use stx_core::{
    transaction::{
        MissingField,
        SignError,
    },
    ContractCall,
    ContractIdentifier,
    SignedTransaction,
    TxId,
    UnsignedTransaction,
};
use tracing::{
    debug,
    info_span,
    instrument,
    warn,
    Instrument as _,
    Span,
};
use tryhard::RetryFutureConfig;

use crate::{
    catalog::OperationSpec,
    retry::{
        FixedRetry,
        TransportRetryStrategy,
    },
    signer::Signer,
};

/// What happened to a submitted operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted { txid: TxId },
    Rejected(FailureReason),
}

impl SubmissionOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    #[must_use]
    pub fn txid(&self) -> Option<TxId> {
        match self {
            Self::Accepted {
                txid,
            } => Some(*txid),
            Self::Rejected(_) => None,
        }
    }
}

impl Display for SubmissionOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted {
                txid,
            } => write!(f, "accepted: 0x{txid}"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

/// Why an operation did not make it into the node's mempool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The node refused the transaction.
    Ledger(Rejection),
    /// The node could not be reached, even after retrying.
    Transport(String),
    /// The node answered with success but without a usable transaction id.
    UnexpectedResponse(String),
    /// The transaction could not be built or signed.
    Encoding(String),
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ledger(rejection) => Display::fmt(rejection, f),
            Self::Transport(msg) => write!(f, "Transport: {msg}"),
            Self::UnexpectedResponse(msg) => write!(f, "UnexpectedResponse: {msg}"),
            Self::Encoding(msg) => write!(f, "Encoding: {msg}"),
        }
    }
}

/// Submits one operation using one nonce.
///
/// Implementations report every failure through the returned outcome; the caller's nonce
/// accounting never depends on it.
#[async_trait]
pub trait Submit {
    async fn submit(&self, operation: &OperationSpec, nonce: u64) -> SubmissionOutcome;
}

#[derive(Debug, thiserror::Error)]
enum BuildError {
    #[error(transparent)]
    Incomplete(#[from] MissingField),
    #[error(transparent)]
    Sign(#[from] SignError),
}

/// Signs contract calls to one contract and broadcasts them to the ledger.
#[derive(Debug)]
pub struct LedgerSubmitter {
    client: HttpClient,
    signer: Signer,
    contract: ContractIdentifier,
    fee: u64,
    retry: FixedRetry,
}

impl LedgerSubmitter {
    #[must_use]
    pub fn new(
        client: HttpClient,
        signer: Signer,
        contract: ContractIdentifier,
        fee: u64,
        retry: FixedRetry,
    ) -> Self {
        Self {
            client,
            signer,
            contract,
            fee,
            retry,
        }
    }

    #[must_use]
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    #[must_use]
    pub fn contract(&self) -> &ContractIdentifier {
        &self.contract
    }

    fn sign(
        &self,
        operation: &OperationSpec,
        nonce: u64,
    ) -> Result<SignedTransaction, BuildError> {
        let unsigned = UnsignedTransaction::builder()
            .network(self.signer.network())
            .signer(self.signer.signing_key())
            .nonce(nonce)
            .fee(self.fee)
            .payload(ContractCall {
                contract: self.contract.clone(),
                function: operation.function.clone(),
                args: operation.args.clone(),
            })
            .try_build()?;
        Ok(unsigned.sign(self.signer.signing_key())?)
    }

    /// Builds, signs and broadcasts `operation` with `nonce`.
    #[instrument(
        skip_all,
        fields(nonce = nonce, function = %operation.function, tx.id = tracing::field::Empty),
    )]
    pub async fn submit_operation(
        &self,
        operation: &OperationSpec,
        nonce: u64,
    ) -> SubmissionOutcome {
        let tx = match self.sign(operation, nonce) {
            Ok(tx) => tx,
            Err(error) => {
                warn!(
                    error = &error as &dyn std::error::Error,
                    "failed building transaction"
                );
                return SubmissionOutcome::Rejected(FailureReason::Encoding(error.to_string()));
            }
        };
        let local_id = tx.id();
        Span::current().record("tx.id", tracing::field::display(local_id));
        debug!(len = tx.as_bytes().len(), "broadcasting signed transaction");

        match broadcast_with_retry(&self.client, &tx, self.retry).await {
            Ok(BroadcastResponse::Accepted(txid)) => {
                if txid != local_id {
                    warn!(
                        node.tx.id = %txid,
                        "node reported a transaction id different from the locally computed one",
                    );
                }
                SubmissionOutcome::Accepted {
                    txid,
                }
            }
            Ok(BroadcastResponse::Rejected(rejection)) => {
                if rejection.reason.is_nonce_related() {
                    warn!(
                        %rejection,
                        "node rejected the nonce; another submitter may be using this account",
                    );
                }
                SubmissionOutcome::Rejected(FailureReason::Ledger(rejection))
            }
            Err(error) if error.is_transport() => {
                SubmissionOutcome::Rejected(FailureReason::Transport(display_chain(&error)))
            }
            Err(error) => {
                SubmissionOutcome::Rejected(FailureReason::UnexpectedResponse(display_chain(
                    &error,
                )))
            }
        }
    }
}

#[async_trait]
impl Submit for LedgerSubmitter {
    async fn submit(&self, operation: &OperationSpec, nonce: u64) -> SubmissionOutcome {
        self.submit_operation(operation, nonce).await
    }
}

/// Broadcasts `tx`, repeating the identical bytes while the node cannot be reached.
async fn broadcast_with_retry(
    client: &HttpClient,
    tx: &SignedTransaction,
    retry: FixedRetry,
) -> Result<BroadcastResponse, stx_api_client::Error> {
    let span = Span::current();
    let retry_config = RetryFutureConfig::new(retry.retries())
        .custom_backoff(TransportRetryStrategy::new(retry.delay))
        .on_retry(
            |attempt: u32, next_delay: Option<Duration>, error: &stx_api_client::Error| {
                let wait_duration = next_delay
                    .map(humantime::format_duration)
                    .map(tracing::field::display);
                warn!(
                    parent: &span,
                    attempt,
                    wait_duration,
                    error = error as &dyn std::error::Error,
                    "failed reaching node to broadcast transaction; retrying after backoff",
                );
                futures::future::ready(())
            },
        );
    tryhard::retry_fn(|| {
        let span = info_span!(parent: &span, "attempt broadcast");
        client
            .broadcast_transaction(tx.as_bytes().to_vec())
            .instrument(span)
    })
    .with_config(retry_config)
    .await
}

fn display_chain(error: &dyn std::error::Error) -> String {
    let mut msg = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
