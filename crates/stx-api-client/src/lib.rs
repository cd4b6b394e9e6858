//! A client for the subset of the Stacks ledger API a transaction submitter needs: looking
//! up an account's next nonce and broadcasting signed transactions.
//!
//! # Examples
//! ```no_run
//! # tokio_test::block_on(async {
//! use stx_api_client::HttpClient;
//!
//! let client = HttpClient::new("https://api.testnet.hiro.so")?;
//! let address = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".parse()?;
//! let nonces = client.get_nonces(&address).await?;
//! println!("next nonce: {}", nonces.possible_next_nonce);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! # });
//! ```

mod client;
mod error;
mod response;

pub use client::HttpClient;
pub use reqwest::StatusCode;
pub use error::{
    Error,
    ErrorKind,
};
pub use response::{
    BroadcastResponse,
    NonceResponse,
    Rejection,
    RejectionReason,
};
