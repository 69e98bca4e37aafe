//! Checksum codec: `sum(body) mod 256`, rendered as two uppercase hex digits.

use crate::error::{PacketError, Result};
use crate::hex::{hex_value, HEX_DIGITS};

/// Low 8 bits of the arithmetic sum of `body`.
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// Render a checksum as two uppercase hex digits, high nibble first.
pub fn render(sum: u8) -> [u8; 2] {
    [
        HEX_DIGITS[usize::from(sum >> 4)],
        HEX_DIGITS[usize::from(sum & 0xf)],
    ]
}

/// Parse two hex digits (either case) into a byte.
pub fn parse_hex_pair(hi: u8, lo: u8) -> Result<u8> {
    let hi = hex_value(hi).ok_or(PacketError::InvalidHex { byte: hi })?;
    let lo = hex_value(lo).ok_or(PacketError::InvalidHex { byte: lo })?;
    Ok((hi << 4) | lo)
}
