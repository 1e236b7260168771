//! Decoding and address errors

use thiserror::Error;

/// Errors that can occur while decoding Clarity values or addresses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Invalid hex string")]
    InvalidHex,

    #[error("Unexpected end of input at byte {offset}: needed {needed} more")]
    UnexpectedEnd { offset: usize, needed: usize },

    #[error("Unknown type tag 0x{tag:02x} at byte {offset}")]
    UnknownTag { tag: u8, offset: usize },

    #[error("Non-ASCII byte 0x{byte:02x} in string-ascii at byte {offset}")]
    InvalidAscii { byte: u8, offset: usize },

    #[error("Invalid UTF-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    #[error("{count} trailing bytes after value")]
    TrailingBytes { count: usize },

    #[error("Value nesting exceeds {max} levels")]
    NestingTooDeep { max: usize },

    #[error("Invalid address: {reason}")]
    InvalidAddress { reason: String },

    #[error("Address checksum mismatch")]
    ChecksumMismatch,

    #[error("{context} of length {len} exceeds the wire limit of {max}")]
    TooLong {
        context: &'static str,
        len: usize,
        max: usize,
    },
}
