use std::time::Duration;

use reqwest::{
    header::CONTENT_TYPE,
    Url,
};
use stx_core::{
    Address,
    TxId,
};

use crate::{
    BroadcastResponse,
    Error,
    NonceResponse,
    Rejection,
};

const NONCES_ENDPOINT: &str = "nonces";
const BROADCAST_ENDPOINT: &str = "broadcast";

/// A client for the ledger's HTTP API.
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
    base: Url,
}

impl HttpClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a client for the API rooted at `base`, e.g. `https://api.testnet.hiro.so`.
    ///
    /// # Errors
    /// Returns an error if `base` is not an absolute URL or the underlying HTTP client could
    /// not be constructed.
    pub fn new(base: &str) -> Result<Self, Error> {
        Self::with_timeout(base, Self::DEFAULT_TIMEOUT)
    }

    /// Like [`HttpClient::new`], but with a per-request `timeout`.
    ///
    /// # Errors
    /// See [`HttpClient::new`].
    pub fn with_timeout(base: &str, timeout: Duration) -> Result<Self, Error> {
        let mut base = Url::parse(base).map_err(Error::invalid_url)?;
        // joined endpoints are relative to the last path segment unless it ends in a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::invalid_url)?;
        Ok(Self {
            inner,
            base,
        })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base.join(path).map_err(Error::invalid_url)
    }

    /// Fetches the nonce information of `address`.
    ///
    /// # Errors
    /// Returns an error if the request fails, the API responds with a non-success status,
    /// or the response is not the expected JSON.
    pub async fn get_nonces(&self, address: &Address) -> Result<NonceResponse, Error> {
        let url = self.endpoint(&format!("extended/v1/address/{address}/nonces"))?;
        let response = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(NONCES_ENDPOINT, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(NONCES_ENDPOINT, e))?;
        if !status.is_success() {
            return Err(Error::bad_status(
                NONCES_ENDPOINT,
                status,
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }
        serde_json::from_slice(&body).map_err(|e| Error::deserialization(NONCES_ENDPOINT, e))
    }

    /// Submits a serialized signed transaction to the node's mempool.
    ///
    /// A refusal by the node is returned as [`BroadcastResponse::Rejected`], not as an error.
    ///
    /// # Errors
    /// Returns an error if the request does not complete or an accepting response does not
    /// carry a transaction id.
    pub async fn broadcast_transaction(&self, tx: Vec<u8>) -> Result<BroadcastResponse, Error> {
        let url = self.endpoint("v2/transactions")?;
        let response = self
            .inner
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(tx)
            .send()
            .await
            .map_err(|e| Error::transport(BROADCAST_ENDPOINT, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(BROADCAST_ENDPOINT, e))?;
        if !status.is_success() {
            return Ok(BroadcastResponse::Rejected(Rejection::from_response(
                status, &body,
            )));
        }
        let id: String = serde_json::from_slice(&body)
            .map_err(|e| Error::deserialization(BROADCAST_ENDPOINT, e))?;
        let id: TxId = id
            .parse()
            .map_err(|e| Error::deserialization(BROADCAST_ENDPOINT, e))?;
        Ok(BroadcastResponse::Accepted(id))
    }
}
