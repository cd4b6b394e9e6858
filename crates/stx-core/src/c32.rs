//! Crockford base-32 encoding with a double-sha256 checksum, as used by ledger addresses.
use sha2::{
    Digest as _,
    Sha256,
};

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("`{0}` is not a valid c32 character")]
    InvalidCharacter(char),
    #[error("c32 version `{0}` is out of range; must be less than 32")]
    InvalidVersion(u8),
    #[error("c32check payload is too short to contain a checksum")]
    TooShort,
    #[error("c32check checksum does not match payload")]
    BadChecksum,
}

/// Returns the value of a single c32 character.
///
/// Decoding is lenient in the same way as Crockford's base-32: lower case is accepted,
/// `O` is read as `0`, and `I`/`L` are read as `1`.
fn char_value(c: char) -> Result<u8, Error> {
    let normalized = match c.to_ascii_uppercase() {
        'O' => '0',
        'I' | 'L' => '1',
        other => other,
    };
    ALPHABET
        .iter()
        .position(|&a| char::from(a) == normalized)
        .and_then(|pos| u8::try_from(pos).ok())
        .ok_or(Error::InvalidCharacter(c))
}

pub(crate) fn version_char(version: u8) -> Result<char, Error> {
    ALPHABET
        .get(usize::from(version))
        .map(|&c| char::from(c))
        .ok_or(Error::InvalidVersion(version))
}

pub(crate) fn version_from_char(c: char) -> Result<u8, Error> {
    char_value(c)
}

/// Encodes `input` as c32, preserving leading zero bytes as `0` characters.
#[must_use]
pub fn encode(input: &[u8]) -> String {
    let mut reversed = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;

    for &byte in input.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = u16::from(byte) & ((1 << low_bits_to_take) - 1);
        let value = (low_bits << carry_bits) + carry;
        reversed.push(ALPHABET[usize::from(value)]);
        carry_bits = 8 + carry_bits - 5;
        carry = u16::from(byte) >> (8 - carry_bits);

        if carry_bits >= 5 {
            reversed.push(ALPHABET[usize::from(carry & 0x1f)]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }

    if carry_bits > 0 {
        reversed.push(ALPHABET[usize::from(carry)]);
    }

    while reversed.last() == Some(&b'0') {
        reversed.pop();
    }
    for _ in input.iter().take_while(|&&byte| byte == 0) {
        reversed.push(b'0');
    }

    reversed.iter().rev().map(|&c| char::from(c)).collect()
}

/// Decodes a c32 string, restoring one zero byte per leading `0` character.
///
/// # Errors
/// Returns an error if `input` contains a character outside the c32 alphabet.
pub fn decode(input: &str) -> Result<Vec<u8>, Error> {
    let mut reversed = Vec::with_capacity(input.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;

    for c in input.chars().rev() {
        let value = char_value(c)?;
        carry += u16::from(value) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            reversed.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }

    if carry_bits > 0 {
        reversed.push(carry as u8);
    }

    while reversed.last() == Some(&0) {
        reversed.pop();
    }
    for _ in input.chars().take_while(|&c| c == '0') {
        reversed.push(0);
    }

    reversed.reverse();
    Ok(reversed)
}

fn checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let first = Sha256::new()
        .chain_update([version])
        .chain_update(data)
        .finalize();
    let second = Sha256::digest(first);
    [second[0], second[1], second[2], second[3]]
}

/// Encodes `data` with a 4-byte checksum committing to `version`.
///
/// The version itself is not part of the output; callers prepend its c32 character.
#[must_use]
pub fn check_encode(version: u8, data: &[u8]) -> String {
    let mut payload = data.to_vec();
    payload.extend_from_slice(&checksum(version, data));
    encode(&payload)
}

/// Decodes the output of [`check_encode`], verifying the checksum against `version`.
///
/// # Errors
/// Returns an error if `input` is not valid c32, is too short, or the checksum does not
/// match.
pub fn check_decode(version: u8, input: &str) -> Result<Vec<u8>, Error> {
    let mut payload = decode(input)?;
    if payload.len() < 4 {
        return Err(Error::TooShort);
    }
    let expected = payload.split_off(payload.len() - 4);
    if checksum(version, &payload)[..] != expected[..] {
        return Err(Error::BadChecksum);
    }
    Ok(payload)
}
