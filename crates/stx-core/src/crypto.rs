use std::fmt::{
    self,
    Debug,
    Display,
    Formatter,
};

use k256::ecdsa::{
    RecoveryId,
    Signature as EcdsaSignature,
    SigningKey as EcdsaSigningKey,
    VerifyingKey,
};
use zeroize::Zeroizing;

use crate::address::{
    self,
    Address,
    HASH160_LEN,
};

pub const SECRET_KEY_LEN: usize = 32;
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

/// Suffix on a hex-encoded secret key marking that its public key is used compressed.
const COMPRESSED_SUFFIX: u8 = 0x01;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(ErrorKind);

#[derive(Debug, thiserror::Error)]
enum ErrorKind {
    #[error("secret key must be 64 or 66 hex characters, but got {0}")]
    HexLength(usize),
    #[error("66 character secret keys must end in `01`")]
    CompressionMarker,
    #[error("secret key is not valid hex")]
    Hex(#[source] hex::FromHexError),
    #[error("secret key is not a valid secp256k1 scalar")]
    Scalar(#[source] k256::ecdsa::Error),
    #[error("failed to produce a recoverable signature")]
    Sign(#[source] k256::ecdsa::Error),
}

/// A secp256k1 signing key together with the encoding of its public key.
///
/// The compression flag is part of the key's identity: it changes the account address and
/// the key encoding byte of every transaction it signs.
#[derive(Clone)]
pub struct SigningKey {
    inner: EcdsaSigningKey,
    compressed: bool,
}

impl SigningKey {
    /// Creates a signing key from a raw 32 byte secret.
    ///
    /// # Errors
    /// Returns an error if `secret` is zero or not less than the curve order.
    pub fn from_bytes(secret: &[u8; SECRET_KEY_LEN], compressed: bool) -> Result<Self, Error> {
        let inner =
            EcdsaSigningKey::from_slice(secret).map_err(|e| Error(ErrorKind::Scalar(e)))?;
        Ok(Self {
            inner,
            compressed,
        })
    }

    /// Parses the ledger's hex key format: 64 hex characters for a key whose public key is
    /// uncompressed, or 66 characters ending in `01` for a compressed one.
    ///
    /// # Errors
    /// Returns an error if `s` has the wrong length, a bad compression marker, is not hex,
    /// or is not a valid secret scalar.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = Zeroizing::new(hex::decode(s).map_err(|e| Error(ErrorKind::Hex(e)))?);
        let compressed = match bytes.len() {
            SECRET_KEY_LEN => false,
            len if len == SECRET_KEY_LEN + 1 => {
                if bytes[SECRET_KEY_LEN] != COMPRESSED_SUFFIX {
                    return Err(Error(ErrorKind::CompressionMarker));
                }
                true
            }
            _ => return Err(Error(ErrorKind::HexLength(s.len()))),
        };
        let inner = EcdsaSigningKey::from_slice(&bytes[..SECRET_KEY_LEN])
            .map_err(|e| Error(ErrorKind::Scalar(e)))?;
        Ok(Self {
            inner,
            compressed,
        })
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// The SEC1 encoding of the public key, compressed or not per [`Self::is_compressed`].
    #[must_use]
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.inner
            .verifying_key()
            .to_encoded_point(self.compressed)
            .as_bytes()
            .to_vec()
    }

    /// `RIPEMD160(SHA256(public key))`, which identifies the signer on the ledger.
    #[must_use]
    pub fn public_key_hash(&self) -> [u8; HASH160_LEN] {
        address::hash160(&self.public_key_bytes())
    }

    /// Returns the single-signature address of this key for an address version.
    ///
    /// # Errors
    /// Returns an error if `version` is not a valid address version.
    pub fn address(&self, version: u8) -> Result<Address, address::Error> {
        Address::try_new(version, self.public_key_hash())
    }

    /// Signs a 32 byte digest, producing a low-S signature with its recovery id.
    ///
    /// # Errors
    /// Returns an error if the underlying signer fails, which only happens for degenerate
    /// digests.
    pub fn sign_recoverable(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, Error> {
        let (signature, recovery_id) = self
            .inner
            .sign_prehash_recoverable(digest)
            .map_err(|e| Error(ErrorKind::Sign(e)))?;
        let mut bytes = [0u8; RECOVERABLE_SIGNATURE_LEN];
        bytes[0] = recovery_id.to_byte();
        bytes[1..].copy_from_slice(&signature.to_bytes());
        Ok(RecoverableSignature(bytes))
    }
}

impl Debug for SigningKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

/// A 65 byte secp256k1 signature laid out as `recovery id || r || s`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; RECOVERABLE_SIGNATURE_LEN]);

impl RecoverableSignature {
    pub const EMPTY: Self = Self([0; RECOVERABLE_SIGNATURE_LEN]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; RECOVERABLE_SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; RECOVERABLE_SIGNATURE_LEN] {
        &self.0
    }

    /// Recovers the public key that produced this signature over `digest`.
    ///
    /// Returns `None` if the signature is malformed or recovery fails.
    #[must_use]
    pub fn recover(&self, digest: &[u8; 32]) -> Option<VerifyingKey> {
        let recovery_id = RecoveryId::from_byte(self.0[0])?;
        let signature = EcdsaSignature::from_slice(&self.0[1..]).ok()?;
        VerifyingKey::recover_from_prehash(digest, &signature, recovery_id).ok()
    }
}

impl Debug for RecoverableSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({self})")
    }
}

impl Display for RecoverableSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{
        MAINNET_SINGLESIG,
        TESTNET_SINGLESIG,
    };

    const SECRET: &str = "edf9aee84d9b7abc145504dde6726c64f369d37ee34ded868fabd876c26570bc";

    #[test]
    fn compression_marker_selects_public_key_encoding() {
        let uncompressed = SigningKey::from_hex(SECRET).unwrap();
        let compressed = SigningKey::from_hex(&format!("{SECRET}01")).unwrap();
        assert!(!uncompressed.is_compressed());
        assert!(compressed.is_compressed());
        assert_eq!(65, uncompressed.public_key_bytes().len());
        assert_eq!(33, compressed.public_key_bytes().len());
        assert_ne!(
            uncompressed.public_key_hash(),
            compressed.public_key_hash()
        );
    }

    #[test]
    fn bad_keys_are_rejected() {
        assert!(SigningKey::from_hex(&format!("{SECRET}02")).is_err());
        assert!(SigningKey::from_hex(&SECRET[..62]).is_err());
        assert!(SigningKey::from_hex(&"zz".repeat(32)).is_err());
        assert!(SigningKey::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn address_depends_on_version_only_through_prefix() {
        let key = SigningKey::from_hex(&format!("{SECRET}01")).unwrap();
        let mainnet = key.address(MAINNET_SINGLESIG).unwrap();
        let testnet = key.address(TESTNET_SINGLESIG).unwrap();
        assert_eq!(mainnet.hash160(), testnet.hash160());
        assert!(mainnet.to_string().starts_with("SP"));
        assert!(testnet.to_string().starts_with("ST"));
    }

    #[test]
    fn signature_recovers_the_signer() {
        let key = SigningKey::from_hex(&format!("{SECRET}01")).unwrap();
        let digest = [0x42u8; 32];
        let signature = key.sign_recoverable(&digest).unwrap();
        assert!(signature.as_bytes()[0] <= 3);
        let recovered = signature.recover(&digest).unwrap();
        assert_eq!(
            key.public_key_bytes(),
            recovered.to_encoded_point(true).as_bytes()
        );
    }

    #[test]
    fn signing_is_deterministic() {
        let key = SigningKey::from_hex(SECRET).unwrap();
        let digest = [7u8; 32];
        assert_eq!(
            key.sign_recoverable(&digest).unwrap(),
            key.sign_recoverable(&digest).unwrap()
        );
    }

    #[test]
    fn debug_does_not_leak_the_secret() {
        let key = SigningKey::from_hex(SECRET).unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("public_key"));
    }
}
