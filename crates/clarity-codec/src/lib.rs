//! clarity-codec: Clarity value wire format for read-only call results
//!
//! Read-only contract calls return a hex-encoded, type-tagged binary value.
//! This crate decodes those values with an explicit cursor, encodes call
//! arguments, exposes named-field lookups over tuples, and converts account
//! principals to and from their c32check display form.

pub mod c32;
pub mod error;
pub mod tuple;
pub mod value;

pub use c32::{c32_address, c32_address_decode};
pub use error::CodecError;
pub use tuple::{
    find_account_principal, find_ascii_string, find_optional_principal, find_unsigned_int,
    TupleFields,
};
pub use value::{decode_bytes, decode_hex, principal_arg, uint_arg, ClarityValue, Principal};
