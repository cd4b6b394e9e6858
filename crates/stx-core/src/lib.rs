//! Primitives of the Stacks ledger needed to call contracts: addresses, Clarity values,
//! signing keys and the transaction wire format.

pub mod address;
pub mod c32;
pub mod clarity;
pub mod contract;
pub mod crypto;
pub mod network;
pub mod transaction;

pub use address::Address;
pub use clarity::Value as ClarityValue;
pub use contract::{
    ClarityName,
    ContractIdentifier,
    ContractName,
    FunctionName,
};
pub use crypto::SigningKey;
pub use network::Network;
pub use transaction::{
    ContractCall,
    SignedTransaction,
    TxId,
    UnsignedTransaction,
};
