use std::time::Duration;

use stx_api_client::HttpClient;
use stx_core::Address;
use tracing::{
    debug,
    info_span,
    instrument,
    warn,
    Instrument as _,
    Span,
};

use crate::retry::FixedRetry;

#[derive(Debug, thiserror::Error)]
pub enum NonceError {
    /// Every lookup attempt failed. The run cannot start without a trustworthy nonce.
    #[error("failed fetching the account nonce after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: stx_api_client::Error,
    },
}

/// Hands out an account's nonces in strictly increasing order.
///
/// Seeded once from the ledger; afterwards no network calls are made. Each nonce is handed
/// out exactly once, whatever happens to the transaction that uses it.
#[derive(Debug)]
pub struct NonceCounter {
    initial: u64,
    next: Option<u64>,
}

impl NonceCounter {
    /// Starts counting at `initial`.
    #[must_use]
    pub fn starting_at(initial: u64) -> Self {
        Self {
            initial,
            next: Some(initial),
        }
    }

    /// Starts counting at the next nonce the ledger expects from `address`.
    ///
    /// # Errors
    /// Returns [`NonceError::RetriesExhausted`] if no attempt allowed by `policy` succeeded.
    pub async fn fetch_initial(
        client: &HttpClient,
        address: &Address,
        policy: FixedRetry,
    ) -> Result<Self, NonceError> {
        fetch_initial_nonce(client, address, policy)
            .await
            .map(Self::starting_at)
    }

    #[must_use]
    pub fn initial(&self) -> u64 {
        self.initial
    }

    /// How many nonces were handed out so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        match self.next {
            Some(next) => next - self.initial,
            None => (u64::MAX - self.initial).saturating_add(1),
        }
    }
}

impl Iterator for NonceCounter {
    type Item = u64;

    /// Returns the current nonce and advances the counter.
    ///
    /// Returns `None` only once the nonce space is exhausted.
    fn next(&mut self) -> Option<u64> {
        let nonce = self.next?;
        self.next = nonce.checked_add(1);
        Some(nonce)
    }
}

/// Looks up the next nonce the ledger expects from `address`.
///
/// Retries with a fixed delay on any failure, up to `policy.attempts` attempts in total.
///
/// # Errors
/// Returns [`NonceError::RetriesExhausted`] with the last failure if all attempts failed.
#[instrument(skip_all, fields(%address, attempts = policy.attempts), err)]
pub async fn fetch_initial_nonce(
    client: &HttpClient,
    address: &Address,
    policy: FixedRetry,
) -> Result<u64, NonceError> {
    debug!("fetching starting nonce from ledger");
    let span = Span::current();
    let attempts = policy.attempts.max(1);
    let retry_config = tryhard::RetryFutureConfig::new(policy.retries())
        .fixed_backoff(policy.delay)
        .on_retry(
            |attempt, next_delay: Option<Duration>, error: &stx_api_client::Error| {
                let wait_duration = next_delay
                    .map(humantime::format_duration)
                    .map(tracing::field::display);
                warn!(
                    parent: &span,
                    attempt,
                    wait_duration,
                    error = error as &dyn std::error::Error,
                    "failed fetching nonce from ledger; retrying after backoff",
                );
                futures::future::ready(())
            },
        );

    let response = tryhard::retry_fn(|| {
        let span = info_span!(parent: &span, "attempt fetch nonce");
        client.get_nonces(address).instrument(span)
    })
    .with_config(retry_config)
    .await
    .map_err(|source| NonceError::RetriesExhausted {
        attempts,
        source,
    })?;

    if !response.detected_missing_nonces.is_empty() {
        warn!(
            missing = ?response.detected_missing_nonces,
            "ledger reports gaps in the account's nonces; transactions above a gap stay pending \
             until it is filled",
        );
    }
    debug!(
        nonce = response.possible_next_nonce,
        "fetched starting nonce"
    );
    Ok(response.possible_next_nonce)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{
            method,
            path,
        },
        Mock,
        MockServer,
        ResponseTemplate,
    };

    use super::*;

    const SENDER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";

    fn policy() -> FixedRetry {
        FixedRetry {
            attempts: 3,
            delay: Duration::from_millis(10),
        }
    }

    fn nonce_path() -> String {
        format!("/extended/v1/address/{SENDER}/nonces")
    }

    #[test]
    fn counter_hands_out_consecutive_nonces() {
        let mut counter = NonceCounter::starting_at(5);
        assert_eq!(0, counter.issued());
        let nonces: Vec<_> = counter.by_ref().take(4).collect();
        assert_eq!(vec![5, 6, 7, 8], nonces);
        assert_eq!(4, counter.issued());
        assert_eq!(5, counter.initial());
    }

    #[test]
    fn counter_stops_at_the_end_of_the_nonce_space() {
        let mut counter = NonceCounter::starting_at(u64::MAX - 1);
        assert_eq!(Some(u64::MAX - 1), counter.next());
        assert_eq!(Some(u64::MAX), counter.next());
        assert_eq!(None, counter.next());
        assert_eq!(2, counter.issued());
    }

    #[tokio::test]
    async fn fetches_possible_next_nonce() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(nonce_path()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"possible_next_nonce": 42})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let counter = NonceCounter::fetch_initial(&client, &SENDER.parse().unwrap(), policy())
            .await
            .unwrap();
        assert_eq!(42, counter.initial());
    }

    #[tokio::test]
    async fn recovers_from_transient_failures() {
        let server = MockServer::start().await;
        // mocks registered first take precedence while they still match
        Mock::given(method("GET"))
            .and(path(nonce_path()))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(nonce_path()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"possible_next_nonce": 7})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let nonce = fetch_initial_nonce(&client, &SENDER.parse().unwrap(), policy())
            .await
            .unwrap();
        assert_eq!(7, nonce);
    }

    #[tokio::test]
    async fn exhausted_retries_are_fatal_and_never_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(nonce_path()))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let err = fetch_initial_nonce(&client, &SENDER.parse().unwrap(), policy())
            .await
            .unwrap_err();
        let NonceError::RetriesExhausted {
            attempts,
            source,
        } = err;
        assert_eq!(3, attempts);
        assert_eq!(Some(stx_api_client::StatusCode::INTERNAL_SERVER_ERROR), source.status());
    }
}
