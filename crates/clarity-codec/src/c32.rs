//! c32check account addresses
//!
//! An address is `S`, one alphabet character for the version byte, then the
//! c32 encoding of `hash160 || checksum` where the checksum is the first four
//! bytes of a double SHA-256 over `version || hash160`.

use sha256::digest;

use crate::error::CodecError;

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

fn c32_digit(c: u8) -> Option<u8> {
    let c = match c.to_ascii_uppercase() {
        b'O' => b'0',
        b'L' | b'I' => b'1',
        other => other,
    };
    C32_ALPHABET.iter().position(|&a| a == c).map(|i| i as u8)
}

fn c32_encode(input: &[u8]) -> String {
    let mut result: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u8 = 0;
    let mut carry_bits: u8 = 0;

    for &byte in input.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = byte & ((1 << low_bits_to_take) - 1);
        result.push(C32_ALPHABET[((low_bits << carry_bits) + carry) as usize]);

        carry_bits += 3;
        carry = byte >> (8 - carry_bits);

        if carry_bits >= 5 {
            result.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }

    if carry_bits > 0 {
        result.push(C32_ALPHABET[carry as usize]);
    }

    while result.last() == Some(&C32_ALPHABET[0]) {
        result.pop();
    }

    for _ in input.iter().take_while(|&&b| b == 0) {
        result.push(C32_ALPHABET[0]);
    }

    result.iter().rev().map(|&b| b as char).collect()
}

fn c32_decode(input: &str) -> Result<Vec<u8>, CodecError> {
    // least significant digit first
    let digits = input
        .bytes()
        .rev()
        .map(|c| {
            c32_digit(c).ok_or_else(|| CodecError::InvalidAddress {
                reason: format!("invalid c32 character '{}'", c as char),
            })
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let mut result = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;

    for &digit in &digits {
        carry += (digit as u16) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            result.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }

    if carry_bits > 0 {
        result.push(carry as u8);
    }

    while result.last() == Some(&0) {
        result.pop();
    }

    for _ in digits.iter().rev().take_while(|&&d| d == 0) {
        result.push(0);
    }

    result.reverse();
    Ok(result)
}

fn checksum(version: u8, hash160: &[u8; 20]) -> [u8; 4] {
    let mut data = Vec::with_capacity(21);
    data.push(version);
    data.extend_from_slice(hash160);

    let first = hex::decode(digest(&data)).unwrap_or_default();
    let second = hex::decode(digest(&first)).unwrap_or_default();

    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

/// Encode a version byte and hash160 as a c32check address.
///
/// The version must fit in one c32 digit (`0..32`).
pub fn c32_address(version: u8, hash160: &[u8; 20]) -> Result<String, CodecError> {
    let prefix = C32_ALPHABET
        .get(version as usize)
        .ok_or_else(|| CodecError::InvalidAddress {
            reason: format!("version {} does not fit in one c32 digit", version),
        })?;

    let mut data = hash160.to_vec();
    data.extend_from_slice(&checksum(version, hash160));

    Ok(format!("S{}{}", *prefix as char, c32_encode(&data)))
}

/// Decode a c32check address into its version byte and hash160.
///
/// Case is ignored and `O`, `L`, `I` are read as their look-alike digits.
/// A trailing `.<contract>` suffix is not accepted here.
pub fn c32_address_decode(address: &str) -> Result<(u8, [u8; 20]), CodecError> {
    let address = address.trim();
    if !address.is_ascii() || address.len() < 3 {
        return Err(CodecError::InvalidAddress {
            reason: "too short".into(),
        });
    }

    let bytes = address.as_bytes();
    if bytes[0].to_ascii_uppercase() != b'S' {
        return Err(CodecError::InvalidAddress {
            reason: "must start with 'S'".into(),
        });
    }

    let version = c32_digit(bytes[1]).ok_or_else(|| CodecError::InvalidAddress {
        reason: format!("invalid version character '{}'", bytes[1] as char),
    })?;

    let data = c32_decode(&address[2..])?;
    if data.len() != 24 {
        return Err(CodecError::InvalidAddress {
            reason: format!("expected 24 payload bytes, got {}", data.len()),
        });
    }

    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(&data[..20]);

    if data[20..] != checksum(version, &hash160) {
        return Err(CodecError::ChecksumMismatch);
    }

    Ok((version, hash160))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_hash_addresses() {
        assert_eq!(c32_address(22, &[0u8; 20]).unwrap(), "SP000000000000000000002Q6VF78");
        assert_eq!(c32_address(26, &[0u8; 20]).unwrap(), "ST000000000000000000002AMW42H");
    }

    #[test]
    fn test_decode_zero_hash_address() {
        let (version, hash) = c32_address_decode("SP000000000000000000002Q6VF78").unwrap();
        assert_eq!(version, 22);
        assert_eq!(hash, [0u8; 20]);
    }

    #[test]
    fn test_round_trip_real_address() {
        let addr = "ST2BKV3K4DQQS6GMFJYT1MY4TQS228190RCSHAGN3";
        let (version, hash) = c32_address_decode(addr).unwrap();
        assert_eq!(version, 26);
        assert_eq!(c32_address(version, &hash).unwrap(), addr);
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        let upper = c32_address_decode("ST2BKV3K4DQQS6GMFJYT1MY4TQS228190RCSHAGN3").unwrap();
        let lower = c32_address_decode("st2bkv3k4dqqs6gmfjyt1my4tqs228190rcshagn3").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_checksum_mismatch() {
        assert_eq!(
            c32_address_decode("ST2BKV3K4DQQS6GMFJYT1MY4TQS228190RCSHAGN4").unwrap_err(),
            CodecError::ChecksumMismatch
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(c32_address_decode("").is_err());
        assert!(c32_address_decode("XT2BKV3K4DQQS6GMFJYT1MY4TQS228190RCSHAGN3").is_err());
        assert!(c32_address_decode("ST2BKV-K4DQQS6GMFJYT1MY4TQS228190RCSHAGN3").is_err());
        assert!(c32_address_decode("ST2BKV").is_err());
    }

    #[test]
    fn test_version_outside_c32_digit_is_rejected() {
        assert!(c32_address(31, &[0u8; 20]).is_ok());
        for version in [32u8, 58, 255] {
            assert!(matches!(
                c32_address(version, &[0u8; 20]),
                Err(CodecError::InvalidAddress { .. })
            ));
        }
    }
}
