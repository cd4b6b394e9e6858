//! Submits batches of contract calls from one account, consuming the account's nonces
//! strictly in order.
pub mod batcher;
pub mod catalog;
pub mod config;
pub mod credential;
pub mod nonce;
pub mod orchestrator;
pub mod report;
pub mod retry;
pub mod signer;
pub mod submitter;
pub mod telemetry;

pub use batcher::Batcher;
pub use config::Config;
