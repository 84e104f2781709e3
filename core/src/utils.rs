use std::fmt;

use num_enum::TryFromPrimitive;
use serde::Serializer;
use thiserror::Error;

/// Render a registry id by variant name, falling back to hex for unknown values.
pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

pub fn fmt_bytes(b: &[u8]) -> String {
    if b.iter().all(|&c| c.is_ascii_graphic() || c == b' ') {
        format!("b\"{}\"", String::from_utf8_lossy(b))
    } else {
        format!("0x{}", hex::encode(b))
    }
}

/// serde helper: byte buffers as lowercase hex strings.
pub fn serialize_hex<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("hex string has odd length {0}")]
    OddLength(usize),
    #[error("invalid hex digit {ch:?} at position {index}")]
    InvalidDigit { ch: char, index: usize },
}

/// Parse key or IV material written as a hex string.
///
/// Surrounding whitespace, an optional `0x` prefix and inner spaces/colons
/// (as printed by packet dumps) are accepted.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, HexError> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }

    hex::decode(&digits).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { c, index } => {
            HexError::InvalidDigit { ch: c, index }
        }
        hex::FromHexError::OddLength => HexError::OddLength(digits.len()),
        hex::FromHexError::InvalidStringLength => HexError::OddLength(digits.len()),
    })
}
