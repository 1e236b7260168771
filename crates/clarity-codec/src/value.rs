//! Clarity value decoding and encoding
//!
//! Every value starts with a one-byte type tag followed by a tag-specific
//! payload. All multi-byte integers are big-endian.
//!
//! ```text
//! 0x00 int              16-byte signed
//! 0x01 uint             16-byte unsigned
//! 0x02 buffer           u32 length, bytes
//! 0x03 true / 0x04 false
//! 0x05 standard principal   version u8, 20-byte hash160
//! 0x06 contract principal   version u8, 20-byte hash160, u8 name length, name
//! 0x07 (ok v) / 0x08 (err v)
//! 0x09 none / 0x0a (some v)
//! 0x0b list             u32 length, values
//! 0x0c tuple            u32 count, (u8 name length, name, value)*
//! 0x0d string-ascii     u32 length, bytes
//! 0x0e string-utf8      u32 length, bytes
//! ```

use serde::Serialize;

use crate::c32::c32_address;
use crate::error::CodecError;

/// Maximum nesting depth accepted by the decoder
pub const MAX_DEPTH: usize = 32;

pub mod tags {
    pub const INT: u8 = 0x00;
    pub const UINT: u8 = 0x01;
    pub const BUFFER: u8 = 0x02;
    pub const TRUE: u8 = 0x03;
    pub const FALSE: u8 = 0x04;
    pub const STANDARD_PRINCIPAL: u8 = 0x05;
    pub const CONTRACT_PRINCIPAL: u8 = 0x06;
    pub const RESPONSE_OK: u8 = 0x07;
    pub const RESPONSE_ERR: u8 = 0x08;
    pub const NONE: u8 = 0x09;
    pub const SOME: u8 = 0x0a;
    pub const LIST: u8 = 0x0b;
    pub const TUPLE: u8 = 0x0c;
    pub const STRING_ASCII: u8 = 0x0d;
    pub const STRING_UTF8: u8 = 0x0e;
}

/// Account or contract principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub version: u8,
    #[serde(with = "hex_bytes")]
    pub hash160: [u8; 20],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
}

impl Principal {
    pub fn standard(version: u8, hash160: [u8; 20]) -> Self {
        Self {
            version,
            hash160,
            contract_name: None,
        }
    }

    /// c32check display form, with `.<name>` appended for contract principals
    pub fn to_address(&self) -> Result<String, CodecError> {
        let account = c32_address(self.version, &self.hash160)?;
        Ok(match &self.contract_name {
            Some(name) => format!("{}.{}", account, name),
            None => account,
        })
    }
}

/// A decoded Clarity value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Buffer(Vec<u8>),
    Bool(bool),
    Principal(Principal),
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    /// Tuple entries in wire order
    Tuple(Vec<(String, ClarityValue)>),
    StringAscii(String),
    StringUtf8(String),
}

impl ClarityValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Buffer(_) => "buffer",
            Self::Bool(_) => "bool",
            Self::Principal(_) => "principal",
            Self::ResponseOk(_) => "ok",
            Self::ResponseErr(_) => "err",
            Self::OptionalNone => "none",
            Self::OptionalSome(_) => "some",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::StringAscii(_) => "string-ascii",
            Self::StringUtf8(_) => "string-utf8",
        }
    }

    /// Strip any number of `(some ..)` and `(ok ..)` wrappers
    pub fn unwrap_some_ok(&self) -> &ClarityValue {
        let mut current = self;
        loop {
            match current {
                Self::OptionalSome(inner) | Self::ResponseOk(inner) => current = inner,
                other => return other,
            }
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_principal(&self) -> Option<&Principal> {
        match self {
            Self::Principal(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringAscii(s) | Self::StringUtf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::OptionalNone)
    }

    /// Serialize to wire bytes.
    ///
    /// Fails when a name or length does not fit its wire prefix.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Serialize to a `0x`-prefixed hex string, the form read-only calls expect
    pub fn to_hex(&self) -> Result<String, CodecError> {
        Ok(format!("0x{}", hex::encode(self.encode()?)))
    }

    fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Self::Int(v) => {
                out.push(tags::INT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Self::UInt(v) => {
                out.push(tags::UINT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Self::Buffer(bytes) => {
                out.push(tags::BUFFER);
                push_len_prefixed(out, bytes, "buffer")?;
            }
            Self::Bool(true) => out.push(tags::TRUE),
            Self::Bool(false) => out.push(tags::FALSE),
            Self::Principal(p) => match &p.contract_name {
                None => {
                    out.push(tags::STANDARD_PRINCIPAL);
                    out.push(p.version);
                    out.extend_from_slice(&p.hash160);
                }
                Some(name) => {
                    out.push(tags::CONTRACT_PRINCIPAL);
                    out.push(p.version);
                    out.extend_from_slice(&p.hash160);
                    push_name(out, name, "contract name")?;
                }
            },
            Self::ResponseOk(inner) => {
                out.push(tags::RESPONSE_OK);
                inner.encode_into(out)?;
            }
            Self::ResponseErr(inner) => {
                out.push(tags::RESPONSE_ERR);
                inner.encode_into(out)?;
            }
            Self::OptionalNone => out.push(tags::NONE),
            Self::OptionalSome(inner) => {
                out.push(tags::SOME);
                inner.encode_into(out)?;
            }
            Self::List(items) => {
                out.push(tags::LIST);
                push_u32_len(out, items.len(), "list")?;
                for item in items {
                    item.encode_into(out)?;
                }
            }
            Self::Tuple(entries) => {
                out.push(tags::TUPLE);
                push_u32_len(out, entries.len(), "tuple")?;
                for (name, value) in entries {
                    push_name(out, name, "tuple field name")?;
                    value.encode_into(out)?;
                }
            }
            Self::StringAscii(s) => {
                out.push(tags::STRING_ASCII);
                push_len_prefixed(out, s.as_bytes(), "string-ascii")?;
            }
            Self::StringUtf8(s) => {
                out.push(tags::STRING_UTF8);
                push_len_prefixed(out, s.as_bytes(), "string-utf8")?;
            }
        }
        Ok(())
    }
}

fn push_u32_len(out: &mut Vec<u8>, len: usize, context: &'static str) -> Result<(), CodecError> {
    let prefix = u32::try_from(len).map_err(|_| CodecError::TooLong {
        context,
        len,
        max: u32::MAX as usize,
    })?;
    out.extend_from_slice(&prefix.to_be_bytes());
    Ok(())
}

fn push_len_prefixed(
    out: &mut Vec<u8>,
    bytes: &[u8],
    context: &'static str,
) -> Result<(), CodecError> {
    push_u32_len(out, bytes.len(), context)?;
    out.extend_from_slice(bytes);
    Ok(())
}

/// Names carry a one-byte length prefix
fn push_name(out: &mut Vec<u8>, name: &str, context: &'static str) -> Result<(), CodecError> {
    let len = u8::try_from(name.len()).map_err(|_| CodecError::TooLong {
        context,
        len: name.len(),
        max: u8::MAX as usize,
    })?;
    out.push(len);
    out.extend_from_slice(name.as_bytes());
    Ok(())
}

/// Hex argument for a `uint` id: `0x01` followed by 32 hex digits
pub fn uint_arg(value: u128) -> String {
    format!("0x{:02x}{:032x}", tags::UINT, value)
}

/// Hex argument for a standard principal
pub fn principal_arg(version: u8, hash160: [u8; 20]) -> String {
    format!(
        "0x{:02x}{:02x}{}",
        tags::STANDARD_PRINCIPAL,
        version,
        hex::encode(hash160)
    )
}

/// Decode a hex string (with or without `0x`) into a single value.
///
/// Trailing bytes after the value are rejected.
pub fn decode_hex(input: &str) -> Result<ClarityValue, CodecError> {
    let trimmed = input.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(stripped).map_err(|_| CodecError::InvalidHex)?;
    decode_bytes(&bytes)
}

/// Decode raw bytes into a single value
pub fn decode_bytes(bytes: &[u8]) -> Result<ClarityValue, CodecError> {
    let mut cursor = Cursor::new(bytes);
    let value = cursor.read_value(0)?;
    let remaining = cursor.remaining();
    if remaining > 0 {
        return Err(CodecError::TrailingBytes { count: remaining });
    }
    Ok(value)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEnd {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn read_16(&mut self) -> Result<[u8; 16], CodecError> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.take(16)?);
        Ok(buf)
    }

    fn read_hash160(&mut self) -> Result<[u8; 20], CodecError> {
        let mut buf = [0u8; 20];
        buf.copy_from_slice(self.take(20)?);
        Ok(buf)
    }

    /// Length-prefixed byte run. The length is checked against the remaining
    /// input before anything is allocated.
    fn read_len_prefixed(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    fn read_name(&mut self, context: &'static str) -> Result<String, CodecError> {
        let len = self.read_u8()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8 { context })
    }

    fn read_value(&mut self, depth: usize) -> Result<ClarityValue, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::NestingTooDeep { max: MAX_DEPTH });
        }

        let offset = self.pos;
        let tag = self.read_u8()?;
        let value = match tag {
            tags::INT => ClarityValue::Int(i128::from_be_bytes(self.read_16()?)),
            tags::UINT => ClarityValue::UInt(u128::from_be_bytes(self.read_16()?)),
            tags::BUFFER => ClarityValue::Buffer(self.read_len_prefixed()?.to_vec()),
            tags::TRUE => ClarityValue::Bool(true),
            tags::FALSE => ClarityValue::Bool(false),
            tags::STANDARD_PRINCIPAL => {
                let version = self.read_u8()?;
                let hash160 = self.read_hash160()?;
                ClarityValue::Principal(Principal::standard(version, hash160))
            }
            tags::CONTRACT_PRINCIPAL => {
                let version = self.read_u8()?;
                let hash160 = self.read_hash160()?;
                let name = self.read_name("contract name")?;
                ClarityValue::Principal(Principal {
                    version,
                    hash160,
                    contract_name: Some(name),
                })
            }
            tags::RESPONSE_OK => ClarityValue::ResponseOk(Box::new(self.read_value(depth + 1)?)),
            tags::RESPONSE_ERR => ClarityValue::ResponseErr(Box::new(self.read_value(depth + 1)?)),
            tags::NONE => ClarityValue::OptionalNone,
            tags::SOME => ClarityValue::OptionalSome(Box::new(self.read_value(depth + 1)?)),
            tags::LIST => {
                let len = self.read_u32()? as usize;
                // Every element takes at least one byte.
                let mut items = Vec::with_capacity(len.min(self.remaining()));
                for _ in 0..len {
                    items.push(self.read_value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            tags::TUPLE => {
                let count = self.read_u32()? as usize;
                let mut entries = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    let name = self.read_name("tuple field name")?;
                    let value = self.read_value(depth + 1)?;
                    entries.push((name, value));
                }
                ClarityValue::Tuple(entries)
            }
            tags::STRING_ASCII => {
                let start = self.pos + 4;
                let raw = self.read_len_prefixed()?;
                if let Some(i) = raw.iter().position(|b| !b.is_ascii()) {
                    return Err(CodecError::InvalidAscii {
                        byte: raw[i],
                        offset: start + i,
                    });
                }
                ClarityValue::StringAscii(raw.iter().map(|&b| b as char).collect())
            }
            tags::STRING_UTF8 => {
                let raw = self.read_len_prefixed()?;
                let s = std::str::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8 {
                    context: "string-utf8",
                })?;
                ClarityValue::StringUtf8(s.to_string())
            }
            other => return Err(CodecError::UnknownTag { tag: other, offset }),
        };
        Ok(value)
    }
}

mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8; 20], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii(s: &str) -> String {
        let mut out = format!("0d{:08x}", s.len());
        out.push_str(&hex::encode(s));
        out
    }

    #[test]
    fn test_uint_arg_format() {
        assert_eq!(uint_arg(1), "0x0100000000000000000000000000000001");
        assert_eq!(uint_arg(0x2a).len(), 2 + 2 + 32);
        assert_eq!(uint_arg(u128::MAX), ClarityValue::UInt(u128::MAX).to_hex().unwrap());
    }

    #[test]
    fn test_overlong_names_fail_to_encode() {
        let long = "x".repeat(256);

        let tuple = ClarityValue::Tuple(vec![(long.clone(), ClarityValue::UInt(1))]);
        assert_eq!(
            tuple.encode().unwrap_err(),
            CodecError::TooLong {
                context: "tuple field name",
                len: 256,
                max: 255
            }
        );

        let contract = ClarityValue::Principal(Principal {
            version: 26,
            hash160: [0u8; 20],
            contract_name: Some(long),
        });
        assert!(matches!(
            contract.to_hex(),
            Err(CodecError::TooLong { context: "contract name", .. })
        ));

        let fits = ClarityValue::Tuple(vec![("x".repeat(255), ClarityValue::UInt(1))]);
        assert_eq!(decode_hex(&fits.to_hex().unwrap()).unwrap(), fits);
    }

    #[test]
    fn test_to_address_rejects_wide_version() {
        let principal = Principal::standard(0x40, [0u8; 20]);
        assert!(matches!(
            principal.to_address(),
            Err(CodecError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_decode_ok_uint() {
        let value = decode_hex("0x070100000000000000000000000000000003").unwrap();
        assert_eq!(
            value,
            ClarityValue::ResponseOk(Box::new(ClarityValue::UInt(3)))
        );
        assert_eq!(value.unwrap_some_ok().as_uint(), Some(3));
    }

    #[test]
    fn test_decode_bools_and_none() {
        assert_eq!(decode_hex("0x03").unwrap(), ClarityValue::Bool(true));
        assert_eq!(decode_hex("04").unwrap(), ClarityValue::Bool(false));
        assert!(decode_hex("0x09").unwrap().is_none());
    }

    #[test]
    fn test_decode_negative_int() {
        let hex = format!("0x00{}", hex::encode((-5i128).to_be_bytes()));
        assert_eq!(decode_hex(&hex).unwrap(), ClarityValue::Int(-5));
    }

    #[test]
    fn test_decode_tuple_in_some() {
        let hex = format!(
            "0x0a0c00000002{}{}{}{}",
            format!("06{}", hex::encode("amount")),
            "0100000000000000000000000000000064",
            format!("06{}", hex::encode("status")),
            ascii("open"),
        );
        let value = decode_hex(&hex).unwrap();
        match value.unwrap_some_ok() {
            ClarityValue::Tuple(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].0, "amount");
                assert_eq!(entries[0].1, ClarityValue::UInt(100));
                assert_eq!(entries[1].1.as_str(), Some("open"));
            }
            other => panic!("expected tuple, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_encode_decode_nested() {
        let value = ClarityValue::ResponseOk(Box::new(ClarityValue::List(vec![
            ClarityValue::OptionalNone,
            ClarityValue::Buffer(vec![1, 2, 3]),
            ClarityValue::StringUtf8("héllo".into()),
            ClarityValue::Principal(Principal {
                version: 26,
                hash160: [7u8; 20],
                contract_name: Some("loan-protocol-v35".into()),
            }),
        ])));
        assert_eq!(decode_hex(&value.to_hex().unwrap()).unwrap(), value);
    }

    #[test]
    fn test_truncated_input() {
        let err = decode_hex("0x01000000").unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEnd { offset: 1, .. }));
    }

    #[test]
    fn test_oversized_length_is_rejected_without_allocating() {
        // buffer claiming 4 GiB with two bytes of payload
        let err = decode_hex("0x02ffffffff0102").unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEnd { .. }));
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            decode_hex("0x07ff").unwrap_err(),
            CodecError::UnknownTag { tag: 0xff, offset: 1 }
        );
    }

    #[test]
    fn test_trailing_bytes() {
        assert_eq!(
            decode_hex("0x0303").unwrap_err(),
            CodecError::TrailingBytes { count: 1 }
        );
    }

    #[test]
    fn test_invalid_hex() {
        assert_eq!(decode_hex("0xzz").unwrap_err(), CodecError::InvalidHex);
        assert_eq!(decode_hex("(none)").unwrap_err(), CodecError::InvalidHex);
    }

    #[test]
    fn test_non_ascii_in_ascii_string() {
        let err = decode_hex("0x0d0000000241ff").unwrap_err();
        assert_eq!(err, CodecError::InvalidAscii { byte: 0xff, offset: 6 });
    }

    #[test]
    fn test_nesting_limit() {
        let hex = format!("0x{}09", "0a".repeat(MAX_DEPTH + 2));
        assert_eq!(
            decode_hex(&hex).unwrap_err(),
            CodecError::NestingTooDeep { max: MAX_DEPTH }
        );
    }

    #[test]
    fn test_principal_arg_layout() {
        let arg = principal_arg(26, [0xab; 20]);
        assert!(arg.starts_with("0x051a"));
        assert_eq!(arg.len(), 2 + 2 + 2 + 40);
    }
}
