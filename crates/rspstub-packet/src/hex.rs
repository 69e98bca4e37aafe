//! ASCII hex helpers shared by the checksum codec and command arguments.

use bytes::BufMut;

use crate::error::{PacketError, Result};

/// Uppercase hex digits, indexed by nibble value.
pub const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Value of a single hex digit (`0-9`, `A-F`, `a-f`).
pub fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

/// Append `bytes` to `dst` as uppercase hex pairs.
pub fn encode_hex(bytes: &[u8], dst: &mut impl BufMut) {
    for &byte in bytes {
        dst.put_u8(HEX_DIGITS[usize::from(byte >> 4)]);
        dst.put_u8(HEX_DIGITS[usize::from(byte & 0xf)]);
    }
}

/// Decode a string of hex pairs into bytes.
pub fn decode_hex(digits: &[u8]) -> Result<Vec<u8>> {
    if digits.len() % 2 != 0 {
        return Err(PacketError::OddHexLength { len: digits.len() });
    }
    digits
        .chunks_exact(2)
        .map(|pair| crate::checksum::parse_hex_pair(pair[0], pair[1]))
        .collect()
}

/// Parse a big-endian hex number such as an address or a length.
///
/// Empty input and values wider than 64 bits are rejected.
pub fn parse_hex_u64(digits: &[u8]) -> Result<u64> {
    if digits.is_empty() {
        return Err(PacketError::OddHexLength { len: 0 });
    }
    let mut value: u64 = 0;
    for &byte in digits {
        let nibble = hex_value(byte).ok_or(PacketError::InvalidHex { byte })?;
        if value >> 60 != 0 {
            return Err(PacketError::InvalidHex { byte });
        }
        value = (value << 4) | u64::from(nibble);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_value_accepts_both_cases() {
        assert_eq!(hex_value(b'0'), Some(0));
        assert_eq!(hex_value(b'9'), Some(9));
        assert_eq!(hex_value(b'a'), Some(10));
        assert_eq!(hex_value(b'F'), Some(15));
        assert_eq!(hex_value(b'g'), None);
        assert_eq!(hex_value(b'#'), None);
    }

    #[test]
    fn encode_hex_is_uppercase() {
        let mut out = Vec::new();
        encode_hex(&[0x00, 0xAB, 0x7f], &mut out);
        assert_eq!(out, b"00AB7F");
    }

    #[test]
    fn decode_hex_mixed_case() {
        assert_eq!(decode_hex(b"deADbeEF").unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(decode_hex(b"").unwrap().is_empty());
    }

    #[test]
    fn decode_hex_rejects_odd_length() {
        assert!(matches!(
            decode_hex(b"abc"),
            Err(PacketError::OddHexLength { len: 3 })
        ));
    }

    #[test]
    fn decode_hex_rejects_non_hex() {
        assert!(matches!(
            decode_hex(b"zz"),
            Err(PacketError::InvalidHex { byte: b'z' })
        ));
    }

    #[test]
    fn parse_hex_u64_values() {
        assert_eq!(parse_hex_u64(b"0").unwrap(), 0);
        assert_eq!(parse_hex_u64(b"1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_u64(b"ffffffffffffffff").unwrap(), u64::MAX);
        assert!(parse_hex_u64(b"").is_err());
        assert!(parse_hex_u64(b"12x4").is_err());
        assert!(parse_hex_u64(b"10000000000000000").is_err());
    }
}
