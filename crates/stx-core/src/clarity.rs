//! Clarity values as they appear in contract-call arguments.
use std::{
    collections::BTreeMap,
    fmt::{
        self,
        Display,
        Formatter,
    },
};

use crate::{
    address::Address,
    contract::{
        ClarityName,
        ContractName,
    },
};

const TYPE_INT: u8 = 0x00;
const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_TRUE: u8 = 0x03;
const TYPE_FALSE: u8 = 0x04;
const TYPE_STANDARD_PRINCIPAL: u8 = 0x05;
const TYPE_CONTRACT_PRINCIPAL: u8 = 0x06;
const TYPE_OK: u8 = 0x07;
const TYPE_ERR: u8 = 0x08;
const TYPE_NONE: u8 = 0x09;
const TYPE_SOME: u8 = 0x0a;
const TYPE_LIST: u8 = 0x0b;
const TYPE_TUPLE: u8 = 0x0c;
const TYPE_STRING_ASCII: u8 = 0x0d;
const TYPE_STRING_UTF8: u8 = 0x0e;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("string-ascii values may only contain ASCII characters")]
pub struct NotAscii;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Int(i128),
    UInt(u128),
    Buffer(Vec<u8>),
    Bool(bool),
    StandardPrincipal(Address),
    ContractPrincipal(Address, ContractName),
    ResponseOk(Box<Value>),
    ResponseErr(Box<Value>),
    OptionalNone,
    OptionalSome(Box<Value>),
    List(Vec<Value>),
    /// Tuple entries are kept sorted by name; the wire format requires it.
    Tuple(BTreeMap<ClarityName, Value>),
    StringAscii(String),
    StringUtf8(String),
}

impl Value {
    #[must_use]
    pub fn uint(value: impl Into<u128>) -> Self {
        Self::UInt(value.into())
    }

    #[must_use]
    pub fn principal(address: Address) -> Self {
        Self::StandardPrincipal(address)
    }

    #[must_use]
    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Buffer(bytes.into())
    }

    /// Constructs a `string-ascii` value.
    ///
    /// # Errors
    /// Returns [`NotAscii`] if `s` contains a non-ASCII character.
    pub fn string_ascii(s: impl Into<String>) -> Result<Self, NotAscii> {
        let s = s.into();
        if !s.is_ascii() {
            return Err(NotAscii);
        }
        Ok(Self::StringAscii(s))
    }

    #[must_use]
    pub fn string_utf8(s: impl Into<String>) -> Self {
        Self::StringUtf8(s.into())
    }

    #[must_use]
    pub fn some(value: Value) -> Self {
        Self::OptionalSome(Box::new(value))
    }

    #[must_use]
    pub fn none() -> Self {
        Self::OptionalNone
    }

    /// Appends the consensus serialization of `self` to `buf`.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Int(v) => {
                buf.push(TYPE_INT);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Self::UInt(v) => {
                buf.push(TYPE_UINT);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Self::Buffer(bytes) => {
                buf.push(TYPE_BUFFER);
                put_len_prefixed(buf, bytes);
            }
            Self::Bool(true) => buf.push(TYPE_TRUE),
            Self::Bool(false) => buf.push(TYPE_FALSE),
            Self::StandardPrincipal(address) => {
                buf.push(TYPE_STANDARD_PRINCIPAL);
                put_address(buf, address);
            }
            Self::ContractPrincipal(address, name) => {
                buf.push(TYPE_CONTRACT_PRINCIPAL);
                put_address(buf, address);
                name.serialize_into(buf);
            }
            Self::ResponseOk(inner) => {
                buf.push(TYPE_OK);
                inner.serialize_into(buf);
            }
            Self::ResponseErr(inner) => {
                buf.push(TYPE_ERR);
                inner.serialize_into(buf);
            }
            Self::OptionalNone => buf.push(TYPE_NONE),
            Self::OptionalSome(inner) => {
                buf.push(TYPE_SOME);
                inner.serialize_into(buf);
            }
            Self::List(items) => {
                buf.push(TYPE_LIST);
                put_u32_len(buf, items.len());
                for item in items {
                    item.serialize_into(buf);
                }
            }
            Self::Tuple(entries) => {
                buf.push(TYPE_TUPLE);
                put_u32_len(buf, entries.len());
                for (name, value) in entries {
                    name.serialize_into(buf);
                    value.serialize_into(buf);
                }
            }
            Self::StringAscii(s) => {
                buf.push(TYPE_STRING_ASCII);
                put_len_prefixed(buf, s.as_bytes());
            }
            Self::StringUtf8(s) => {
                buf.push(TYPE_STRING_UTF8);
                put_len_prefixed(buf, s.as_bytes());
            }
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }
}

fn put_address(buf: &mut Vec<u8>, address: &Address) {
    buf.push(address.version());
    buf.extend_from_slice(address.hash160());
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "clarity values are bounded far below u32::MAX bytes"
)]
fn put_u32_len(buf: &mut Vec<u8>, len: usize) {
    buf.extend_from_slice(&(len as u32).to_be_bytes());
}

fn put_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u32_len(buf, bytes.len());
    buf.extend_from_slice(bytes);
}

/// Renders values the way Clarity source code writes them, e.g. `u1`, `(some 'ST...)`.
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "u{v}"),
            Self::Buffer(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::Bool(v) => write!(f, "{v}"),
            Self::StandardPrincipal(address) => write!(f, "'{address}"),
            Self::ContractPrincipal(address, name) => write!(f, "'{address}.{name}"),
            Self::ResponseOk(inner) => write!(f, "(ok {inner})"),
            Self::ResponseErr(inner) => write!(f, "(err {inner})"),
            Self::OptionalNone => f.write_str("none"),
            Self::OptionalSome(inner) => write!(f, "(some {inner})"),
            Self::List(items) => {
                f.write_str("(list")?;
                for item in items {
                    write!(f, " {item}")?;
                }
                f.write_str(")")
            }
            Self::Tuple(entries) => {
                f.write_str("(tuple")?;
                for (name, value) in entries {
                    write!(f, " ({name} {value})")?;
                }
                f.write_str(")")
            }
            Self::StringAscii(s) => write!(f, "{s:?}"),
            Self::StringUtf8(s) => write!(f, "u{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::TESTNET_SINGLESIG;

    fn address() -> Address {
        Address::try_new(TESTNET_SINGLESIG, [7; 20]).unwrap()
    }

    #[test]
    fn uint_is_sixteen_big_endian_bytes() {
        let bytes = Value::uint(1000u32).to_bytes();
        assert_eq!(17, bytes.len());
        assert_eq!(TYPE_UINT, bytes[0]);
        assert_eq!([0x03, 0xe8], bytes[15..]);
    }

    #[test]
    fn negative_int_is_twos_complement() {
        let bytes = Value::Int(-1).to_bytes();
        assert_eq!(vec![0xffu8; 16], bytes[1..]);
    }

    #[test]
    fn strings_and_buffers_are_length_prefixed() {
        let bytes = Value::string_ascii("ipfs://token1").unwrap().to_bytes();
        assert_eq!(TYPE_STRING_ASCII, bytes[0]);
        assert_eq!([0, 0, 0, 13], bytes[1..5]);
        assert_eq!(b"ipfs://token1", &bytes[5..]);

        let bytes = Value::buffer(vec![0u8; 64]).to_bytes();
        assert_eq!([TYPE_BUFFER, 0, 0, 0, 64], bytes[..5]);
        assert_eq!(69, bytes.len());

        let bytes = Value::string_utf8("é").to_bytes();
        assert_eq!([TYPE_STRING_UTF8, 0, 0, 0, 2], bytes[..5]);
    }

    #[test]
    fn non_ascii_is_rejected_for_string_ascii() {
        assert_eq!(Err(NotAscii), Value::string_ascii("naïve"));
    }

    #[test]
    fn principals_carry_version_and_hash() {
        let bytes = Value::principal(address()).to_bytes();
        assert_eq!(22, bytes.len());
        assert_eq!([TYPE_STANDARD_PRINCIPAL, TESTNET_SINGLESIG], bytes[..2]);

        let name: ContractName = "swap-core".parse().unwrap();
        let bytes = Value::ContractPrincipal(address(), name).to_bytes();
        assert_eq!(TYPE_CONTRACT_PRINCIPAL, bytes[0]);
        assert_eq!(9, bytes[22]);
        assert_eq!(b"swap-core", &bytes[23..]);
    }

    #[test]
    fn optionals_wrap_their_payload() {
        assert_eq!(vec![TYPE_NONE], Value::none().to_bytes());
        assert_eq!(
            vec![TYPE_SOME, TYPE_TRUE],
            Value::some(Value::Bool(true)).to_bytes()
        );
    }

    #[test]
    fn tuple_entries_are_serialized_in_name_order() {
        let mut entries = BTreeMap::new();
        entries.insert("b".parse().unwrap(), Value::Bool(false));
        entries.insert("a".parse().unwrap(), Value::Bool(true));
        let bytes = Value::Tuple(entries).to_bytes();
        assert_eq!(
            vec![TYPE_TUPLE, 0, 0, 0, 2, 1, b'a', TYPE_TRUE, 1, b'b', TYPE_FALSE],
            bytes
        );
    }

    #[test]
    fn long_tuple_key_is_length_prefixed_exactly() {
        let key = "k".repeat(128);
        let mut entries = BTreeMap::new();
        entries.insert(key.parse().unwrap(), Value::Bool(true));
        let bytes = Value::Tuple(entries).to_bytes();
        assert_eq!(128, bytes[5]);
        assert_eq!(key.as_bytes(), &bytes[6..134]);
        assert_eq!([TYPE_TRUE], bytes[134..]);
    }

    #[test]
    fn display_matches_clarity_syntax() {
        assert_eq!("u5", Value::uint(5u8).to_string());
        assert_eq!("none", Value::none().to_string());
        assert_eq!("(some u1)", Value::some(Value::uint(1u8)).to_string());
        assert_eq!("0xabab", Value::buffer(vec![0xab, 0xab]).to_string());
        assert_eq!("\"hi\"", Value::string_ascii("hi").unwrap().to_string());
        assert_eq!(
            "(list u1 true)",
            Value::List(vec![Value::uint(1u8), Value::Bool(true)]).to_string()
        );
        assert!(Value::principal(address()).to_string().starts_with("'ST"));
    }
}
