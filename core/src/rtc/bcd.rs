//! Binary-coded decimal conversions for RTC register fields

/// Encode `0..=99` as packed BCD
pub const fn dec_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Decode a packed BCD byte
///
/// Nibbles above 9 are not rejected; callers range-check the result.
pub const fn bcd_to_dec(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}
