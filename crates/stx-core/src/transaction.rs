//! Contract-call transactions authorized by a single signature.
use std::{
    fmt::{
        self,
        Debug,
        Display,
        Formatter,
    },
    str::FromStr,
};

use sha2::{
    Digest as _,
    Sha512_256,
};

use crate::{
    address::HASH160_LEN,
    clarity::Value,
    contract::{
        ContractIdentifier,
        FunctionName,
    },
    crypto::{
        self,
        RecoverableSignature,
        SigningKey,
    },
    network::Network,
};

const AUTH_STANDARD: u8 = 0x04;
const HASH_MODE_P2PKH: u8 = 0x00;
const KEY_ENCODING_COMPRESSED: u8 = 0x00;
const KEY_ENCODING_UNCOMPRESSED: u8 = 0x01;
const ANCHOR_MODE_ANY: u8 = 0x03;
const POST_CONDITION_MODE_ALLOW: u8 = 0x01;
const PAYLOAD_CONTRACT_CALL: u8 = 0x02;

pub const TX_ID_LEN: usize = 32;

/// The call carried by a transaction: which public function of which contract, and with
/// which arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub contract: ContractIdentifier,
    pub function: FunctionName,
    pub args: Vec<Value>,
}

impl ContractCall {
    fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.push(PAYLOAD_CONTRACT_CALL);
        buf.push(self.contract.address.version());
        buf.extend_from_slice(self.contract.address.hash160());
        self.contract.name.serialize_into(buf);
        self.function.serialize_into(buf);
        put_u32(buf, self.args.len());
        for arg in &self.args {
            arg.serialize_into(buf);
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "argument counts are far below u32::MAX"
)]
fn put_u32(buf: &mut Vec<u8>, value: usize) {
    buf.extend_from_slice(&(value as u32).to_be_bytes());
}

/// A contract call that has everything but its signature.
#[derive(Clone, Debug)]
pub struct UnsignedTransaction {
    network: Network,
    signer: [u8; HASH160_LEN],
    compressed: bool,
    nonce: u64,
    fee: u64,
    payload: ContractCall,
}

impl UnsignedTransaction {
    #[must_use]
    pub fn builder() -> UnsignedTransactionBuilder {
        UnsignedTransactionBuilder::default()
    }

    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    #[must_use]
    pub fn fee(&self) -> u64 {
        self.fee
    }

    #[must_use]
    pub fn payload(&self) -> &ContractCall {
        &self.payload
    }

    fn to_bytes_with(&self, nonce: u64, fee: u64, signature: &RecoverableSignature) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        buf.push(self.network.transaction_version());
        buf.extend_from_slice(&self.network.chain_id().to_be_bytes());

        buf.push(AUTH_STANDARD);
        buf.push(HASH_MODE_P2PKH);
        buf.extend_from_slice(&self.signer);
        buf.extend_from_slice(&nonce.to_be_bytes());
        buf.extend_from_slice(&fee.to_be_bytes());
        buf.push(if self.compressed {
            KEY_ENCODING_COMPRESSED
        } else {
            KEY_ENCODING_UNCOMPRESSED
        });
        buf.extend_from_slice(signature.as_bytes());

        buf.push(ANCHOR_MODE_ANY);
        buf.push(POST_CONDITION_MODE_ALLOW);
        put_u32(&mut buf, 0);

        self.payload.serialize_into(&mut buf);
        buf
    }

    /// The digest the signer commits to.
    ///
    /// It is computed over the transaction with its authorization cleared, then bound to the
    /// actual fee and nonce.
    #[must_use]
    pub fn sighash(&self) -> [u8; 32] {
        let cleared = self.to_bytes_with(0, 0, &RecoverableSignature::EMPTY);
        let initial = Sha512_256::digest(cleared);
        Sha512_256::new()
            .chain_update(initial)
            .chain_update([AUTH_STANDARD])
            .chain_update(self.fee.to_be_bytes())
            .chain_update(self.nonce.to_be_bytes())
            .finalize()
            .into()
    }

    /// Signs the transaction.
    ///
    /// # Errors
    /// Returns an error if `key` is not the key this transaction was built for, or if
    /// signing fails.
    pub fn sign(self, key: &SigningKey) -> Result<SignedTransaction, SignError> {
        if key.public_key_hash() != self.signer || key.is_compressed() != self.compressed {
            return Err(SignError::WrongKey);
        }
        let signature = key.sign_recoverable(&self.sighash())?;
        let bytes = self.to_bytes_with(self.nonce, self.fee, &signature);
        let id = TxId(Sha512_256::digest(&bytes).into());
        Ok(SignedTransaction {
            id,
            nonce: self.nonce,
            bytes,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("signing key does not match the transaction's signer")]
    WrongKey,
    #[error(transparent)]
    Crypto(#[from] crypto::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("field `{0}` was not set")]
pub struct MissingField(&'static str);

#[derive(Default)]
pub struct UnsignedTransactionBuilder {
    network: Network,
    signer: Option<([u8; HASH160_LEN], bool)>,
    nonce: u64,
    fee: u64,
    payload: Option<ContractCall>,
}

impl UnsignedTransactionBuilder {
    #[must_use]
    pub fn network(self, network: Network) -> Self {
        Self {
            network,
            ..self
        }
    }

    /// Sets the signer from the key that will sign the transaction.
    #[must_use]
    pub fn signer(self, key: &SigningKey) -> Self {
        Self {
            signer: Some((key.public_key_hash(), key.is_compressed())),
            ..self
        }
    }

    #[must_use]
    pub fn nonce(self, nonce: u64) -> Self {
        Self {
            nonce,
            ..self
        }
    }

    #[must_use]
    pub fn fee(self, fee: u64) -> Self {
        Self {
            fee,
            ..self
        }
    }

    #[must_use]
    pub fn payload(self, payload: ContractCall) -> Self {
        Self {
            payload: Some(payload),
            ..self
        }
    }

    /// # Errors
    /// Returns an error if the signer or the payload were not set.
    pub fn try_build(self) -> Result<UnsignedTransaction, MissingField> {
        let (signer, compressed) = self.signer.ok_or(MissingField("signer"))?;
        let payload = self.payload.ok_or(MissingField("payload"))?;
        Ok(UnsignedTransaction {
            network: self.network,
            signer,
            compressed,
            nonce: self.nonce,
            fee: self.fee,
            payload,
        })
    }
}

/// A signed transaction ready for broadcast.
#[derive(Clone)]
pub struct SignedTransaction {
    id: TxId,
    nonce: u64,
    bytes: Vec<u8>,
}

impl SignedTransaction {
    #[must_use]
    pub fn id(&self) -> TxId {
        self.id
    }

    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Debug for SignedTransaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("id", &self.id)
            .field("nonce", &self.nonce)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A transaction id: the SHA512/256 hash of the signed transaction.
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
pub struct TxId([u8; TX_ID_LEN]);

impl TxId {
    #[must_use]
    pub fn new(bytes: [u8; TX_ID_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; TX_ID_LEN] {
        &self.0
    }
}

impl Display for TxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Debug for TxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({self})")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("transaction id must be {TX_ID_LEN} hex encoded bytes, optionally prefixed with `0x`")]
pub struct InvalidTxId;

impl FromStr for TxId {
    type Err = InvalidTxId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; TX_ID_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| InvalidTxId)?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;

    const SECRET: &str = "edf9aee84d9b7abc145504dde6726c64f369d37ee34ded868fabd876c26570bc01";
    const NONCE_RANGE: std::ops::Range<usize> = 27..35;
    const FEE_RANGE: std::ops::Range<usize> = 35..43;
    const SIGNATURE_RANGE: std::ops::Range<usize> = 44..109;

    fn key() -> SigningKey {
        SigningKey::from_hex(SECRET).unwrap()
    }

    fn call() -> ContractCall {
        let address: Address = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".parse().unwrap();
        ContractCall {
            contract: ContractIdentifier::new(address, "acc-bounded-token".parse().unwrap()),
            function: "unequip".parse().unwrap(),
            args: vec![Value::uint(1u8)],
        }
    }

    fn unsigned(network: Network, nonce: u64) -> UnsignedTransaction {
        UnsignedTransaction::builder()
            .network(network)
            .signer(&key())
            .nonce(nonce)
            .fee(1_000)
            .payload(call())
            .try_build()
            .unwrap()
    }

    #[test]
    fn header_fields_are_at_fixed_offsets() {
        let signed = unsigned(Network::Testnet, 5).sign(&key()).unwrap();
        let bytes = signed.as_bytes();
        assert_eq!(0x80, bytes[0]);
        assert_eq!([0x80, 0, 0, 0], bytes[1..5]);
        assert_eq!([AUTH_STANDARD, HASH_MODE_P2PKH], bytes[5..7]);
        assert_eq!(&key().public_key_hash(), &bytes[7..27]);
        assert_eq!(5u64.to_be_bytes(), bytes[NONCE_RANGE]);
        assert_eq!(1_000u64.to_be_bytes(), bytes[FEE_RANGE]);
        assert_eq!(KEY_ENCODING_COMPRESSED, bytes[43]);
        assert_eq!(
            [ANCHOR_MODE_ANY, POST_CONDITION_MODE_ALLOW, 0, 0, 0, 0, PAYLOAD_CONTRACT_CALL],
            bytes[109..116]
        );
    }

    #[test]
    fn mainnet_uses_mainnet_version_and_chain_id() {
        let signed = unsigned(Network::Mainnet, 0).sign(&key()).unwrap();
        assert_eq!([0x00, 0, 0, 0, 1], signed.as_bytes()[..5]);
    }

    #[test]
    fn payload_ends_with_the_arguments() {
        let signed = unsigned(Network::Testnet, 0).sign(&key()).unwrap();
        let bytes = signed.as_bytes();
        let tail = {
            let mut buf = vec![0, 0, 0, 1];
            buf.extend(Value::uint(1u8).to_bytes());
            buf
        };
        assert!(bytes.ends_with(&tail));
        assert!(bytes
            .windows(b"unequip".len())
            .any(|w| w == b"unequip"));
    }

    #[test]
    fn signature_recovers_the_sender_over_the_sighash() {
        let tx = unsigned(Network::Testnet, 9);
        let sighash = tx.sighash();
        let signed = tx.sign(&key()).unwrap();
        let mut signature = [0u8; 65];
        signature.copy_from_slice(&signed.as_bytes()[SIGNATURE_RANGE]);
        let signature = RecoverableSignature::from_bytes(signature);
        let recovered = signature.recover(&sighash).unwrap();
        assert_eq!(
            key().public_key_bytes(),
            recovered.to_encoded_point(true).as_bytes()
        );
    }

    #[test]
    fn sighash_commits_to_nonce_and_fee() {
        assert_ne!(
            unsigned(Network::Testnet, 1).sighash(),
            unsigned(Network::Testnet, 2).sighash()
        );
    }

    #[test]
    fn txid_is_hash_of_signed_bytes() {
        let signed = unsigned(Network::Testnet, 3).sign(&key()).unwrap();
        let expected: [u8; 32] = Sha512_256::digest(signed.as_bytes()).into();
        assert_eq!(&expected, signed.id().as_bytes());
    }

    #[test]
    fn signing_with_another_key_is_refused() {
        let other = SigningKey::from_hex(&SECRET[..64]).unwrap();
        assert!(matches!(
            unsigned(Network::Testnet, 0).sign(&other),
            Err(SignError::WrongKey)
        ));
    }

    #[test]
    fn txid_parses_with_and_without_prefix() {
        let hex = "ab".repeat(32);
        let plain: TxId = hex.parse().unwrap();
        let prefixed: TxId = format!("0x{hex}").parse().unwrap();
        assert_eq!(plain, prefixed);
        assert_eq!(hex, plain.to_string());
        assert!("abcd".parse::<TxId>().is_err());
    }

    #[test]
    fn builder_requires_signer_and_payload() {
        assert!(UnsignedTransaction::builder().payload(call()).try_build().is_err());
        assert!(UnsignedTransaction::builder().signer(&key()).try_build().is_err());
    }
}
