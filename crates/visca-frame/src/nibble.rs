//! Nibble-packed 16-bit integers.
//!
//! A word travels as four bytes, most significant nibble first, each byte
//! carrying one nibble in its low half. The high half is always zero, so an
//! encoded integer can never contain the 0xFF terminator.

use crate::error::{FrameError, Result};

/// Wire size of one packed word.
pub const WORD_LEN: usize = 4;

/// Pan coordinates span -1440..=1440.
pub const PAN_LIMIT: u16 = 1440;

/// Tilt coordinates span -360..=360.
pub const TILT_LIMIT: u16 = 360;

/// Pack a word into its 4-byte wire form.
pub fn encode_word(value: u16) -> [u8; WORD_LEN] {
    [
        ((value >> 12) & 0x0F) as u8,
        ((value >> 8) & 0x0F) as u8,
        ((value >> 4) & 0x0F) as u8,
        (value & 0x0F) as u8,
    ]
}

/// Unpack a 4-byte wire word.
pub fn decode_word(bytes: &[u8]) -> Result<u16> {
    if bytes.len() != WORD_LEN {
        return Err(FrameError::InvalidEncoding);
    }
    if bytes.iter().any(|b| b & 0xF0 != 0) {
        return Err(FrameError::InvalidEncoding);
    }
    Ok(bytes
        .iter()
        .fold(0u16, |acc, &nibble| (acc << 4) | u16::from(nibble)))
}

/// Pack a signed coordinate.
///
/// Negative values are sent as `((-v) - 1) ^ 0xFFFF`, non-negative values as-is.
/// `limit` bounds the magnitude (see [`PAN_LIMIT`], [`TILT_LIMIT`]).
pub fn encode_signed(value: i16, limit: u16) -> Result<[u8; WORD_LEN]> {
    if value.unsigned_abs() > limit {
        return Err(FrameError::InvalidArgument(format!(
            "coordinate {value} outside -{limit}..={limit}"
        )));
    }

    let word = if value < 0 {
        let magnitude = -i32::from(value);
        ((magnitude - 1) as u16) ^ 0xFFFF
    } else {
        value as u16
    };
    Ok(encode_word(word))
}

/// Unpack a signed coordinate produced by [`encode_signed`].
pub fn decode_signed(bytes: &[u8]) -> Result<i16> {
    let word = decode_word(bytes)?;
    if word & 0x8000 != 0 {
        let magnitude = i32::from(word ^ 0xFFFF);
        Ok((-magnitude - 1) as i16)
    } else {
        Ok(word as i16)
    }
}
