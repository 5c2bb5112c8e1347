use std::fmt;

const DIGITS_PER_BYTE: usize = 2;

/// Decodes pairs of ASCII hex digits into bytes.
pub fn hex_string_to_bytes(hex_string: &[u8]) -> Result<Vec<u8>> {
    if hex_string.len() % DIGITS_PER_BYTE != 0 {
        return Err(InvalidHexString::OddLength(hex_string.len()));
    }
    let mut bytes = Vec::with_capacity(hex_string.len() / DIGITS_PER_BYTE);
    for (pair_idx, hex_digit_pair) in hex_string.chunks(DIGITS_PER_BYTE).enumerate() {
        let offset = pair_idx * DIGITS_PER_BYTE;
        let high_nibble = decode_hex_digit(hex_digit_pair[0])
            .map_err(|digit| InvalidHexString::InvalidDigit { digit, offset })?;
        let low_nibble = decode_hex_digit(hex_digit_pair[1])
            .map_err(|digit| InvalidHexString::InvalidDigit { digit, offset: offset + 1 })?;
        bytes.push(high_nibble << 4 | low_nibble);
    }
    Ok(bytes)
}

fn decode_hex_digit(digit: u8) -> std::result::Result<u8, u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(10 + (digit - b'a')),
        b'A'..=b'F' => Ok(10 + (digit - b'A')),
        d => Err(d),
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum InvalidHexString {
    OddLength(usize),
    InvalidDigit { digit: u8, offset: usize },
}

impl fmt::Display for InvalidHexString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use InvalidHexString::*;
        match self {
            OddLength(len) => write!(f, "odd number of hex digits: {len}"),
            InvalidDigit { digit, offset } => {
                write!(f, "invalid hex digit '{}' at offset {offset}", digit.escape_ascii())
            }
        }
    }
}

impl std::error::Error for InvalidHexString {}

type Result<T> = std::result::Result<T, InvalidHexString>;
