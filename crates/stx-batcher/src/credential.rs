//! Classification of the sender's raw secret.
use std::fmt::{
    self,
    Debug,
    Formatter,
};

use secrecy::{
    ExposeSecret as _,
    SecretString,
};

const MNEMONIC_WORD_COUNTS: [usize; 2] = [12, 24];
const RAW_KEY_LENGTHS: [usize; 2] = [64, 66];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The secret is neither a 12/24 word phrase nor a 64/66 character hex key.
    ///
    /// Carries a description of the secret's shape, never its content.
    #[error("invalid credential format: {0}")]
    InvalidCredentialFormat(&'static str),
}

/// A sender secret, classified by shape.
pub enum Credential {
    /// A whitespace separated phrase of 12 or 24 words, normalized to lower case words
    /// separated by single spaces.
    Mnemonic(SecretString),
    /// A hex key of 64 or 66 characters, without `0x` prefix.
    RawKey(SecretString),
}

impl Credential {
    /// Classifies `raw` as a mnemonic phrase or a hex key.
    ///
    /// Surrounding whitespace and quotes are ignored, as is a `0x` prefix on hex keys.
    /// Phrases are recognized by their word count alone; whether the words form a valid
    /// phrase is decided when a key is derived from it.
    ///
    /// # Errors
    /// Returns [`CredentialError::InvalidCredentialFormat`] if `raw` has neither shape.
    /// The compression marker of a 66 character key is checked when the key is derived.
    pub fn classify(raw: &str) -> Result<Self, CredentialError> {
        let unquoted = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        let word_count = unquoted.split_whitespace().count();
        if MNEMONIC_WORD_COUNTS.contains(&word_count) {
            let phrase = unquoted
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
                .join(" ");
            return Ok(Self::Mnemonic(SecretString::new(phrase)));
        }

        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '"' && *c != '\'')
            .collect();
        let hex = compact
            .strip_prefix("0x")
            .or_else(|| compact.strip_prefix("0X"))
            .unwrap_or(&compact);
        if hex.is_empty() {
            return Err(CredentialError::InvalidCredentialFormat("secret is empty"));
        }
        if !RAW_KEY_LENGTHS.contains(&hex.len()) {
            return Err(CredentialError::InvalidCredentialFormat(
                "expected 12 or 24 words, or 64 or 66 hex characters",
            ));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CredentialError::InvalidCredentialFormat(
                "key contains non-hex characters",
            ));
        }
        Ok(Self::RawKey(SecretString::new(hex.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mnemonic(_) => "mnemonic",
            Self::RawKey(_) => "raw key",
        }
    }

    /// Number of words for a mnemonic, number of hex characters for a raw key.
    #[must_use]
    pub fn secret_len(&self) -> usize {
        match self {
            Self::Mnemonic(phrase) => phrase.expose_secret().split(' ').count(),
            Self::RawKey(hex) => hex.expose_secret().len(),
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind())
            .field("len", &self.secret_len())
            .finish_non_exhaustive()
    }
}
