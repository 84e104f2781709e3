//! headers/decode.rs
//!
//! Field codec (read side), length checks and the dissector.
//!
//! Design notes:
//! - `decode_*` read fixed-width big-endian integers; callers guarantee bounds.
//! - `check_declared_size` and `goose_pdu_range` are the only places that turn
//!   wire lengths into buffer offsets, and they reject anything inconsistent
//!   before an offset is used.
//! - `dissect` needs the fixed header only. A missing or broken tag region is
//!   reported as data, not as an error.

use std::ops::Range;

use byteorder::{BigEndian, ByteOrder};

use crate::constants::offsets;
use crate::constants::{
    APDU_LENGTH_BIAS, FIXED_HEADER_LEN, MIN_MESSAGE_LEN, SIGNATURE_FIELDS_LEN, SPDU_LENGTH_BIAS,
};
use crate::headers::types::{HeaderError, KeyEpoch, RGooseHeader, SecurityInfo, SignatureRegion};

/// Read 2 big-endian bytes at `offset`.
#[inline]
pub fn decode_u16(buffer: &[u8], offset: usize) -> u16 {
    BigEndian::read_u16(&buffer[offset..offset + 2])
}

/// Read 4 big-endian bytes at `offset`.
#[inline]
pub fn decode_u32(buffer: &[u8], offset: usize) -> u32 {
    BigEndian::read_u32(&buffer[offset..offset + 4])
}

#[inline]
pub fn read_key_epoch(buffer: &[u8]) -> KeyEpoch {
    KeyEpoch {
        time_of_current_key: decode_u32(buffer, offsets::TIME_OF_CURRENT_KEY),
        time_to_next_key: decode_u16(buffer, offsets::TIME_TO_NEXT_KEY),
        key_id: decode_u32(buffer, offsets::KEY_ID),
    }
}

/// Message size claimed by the header: `SpduLength + 10`.
#[inline]
pub fn declared_size(buffer: &[u8]) -> usize {
    decode_u32(buffer, offsets::SPDU_LENGTH) as usize + SPDU_LENGTH_BIAS
}

/// Verify the buffer can hold the fixed header plus signature pair and that
/// `SpduLength + 10` equals its length. Returns the message size.
pub fn check_declared_size(buffer: &[u8]) -> Result<usize, HeaderError> {
    if buffer.len() < MIN_MESSAGE_LEN {
        return Err(HeaderError::BufferTooShort { have: buffer.len(), need: MIN_MESSAGE_LEN });
    }
    let declared = declared_size(buffer);
    if declared != buffer.len() {
        return Err(HeaderError::LengthMismatch { declared, actual: buffer.len() });
    }
    Ok(declared)
}

/// Byte range of the GOOSE PDU, `[38, 36 + ApduLength)`.
///
/// `body_len` is the untagged message size. The PDU must end exactly where
/// the SignatureTag/SignatureLength pair starts; stray bytes in between are
/// rejected.
pub fn goose_pdu_range(buffer: &[u8], body_len: usize) -> Result<Range<usize>, HeaderError> {
    let apdu_length = decode_u16(buffer, offsets::APDU_LENGTH);
    let available = body_len.saturating_sub(FIXED_HEADER_LEN + SIGNATURE_FIELDS_LEN);

    let pdu_len = (apdu_length as usize)
        .checked_sub(APDU_LENGTH_BIAS)
        .ok_or(HeaderError::InvalidApduLength { apdu_length, available })?;
    if pdu_len > available {
        return Err(HeaderError::InvalidApduLength { apdu_length, available });
    }
    if pdu_len != available {
        return Err(HeaderError::PduExtentMismatch {
            apdu_length,
            pdu_end: FIXED_HEADER_LEN + pdu_len,
            signature_at: FIXED_HEADER_LEN + available,
        });
    }

    Ok(FIXED_HEADER_LEN..FIXED_HEADER_LEN + pdu_len)
}

/// Decode every field of an R-GOOSE message into an owned view.
///
/// Only the fixed 38-byte header is required.
pub fn dissect(buffer: &[u8]) -> Result<RGooseHeader, HeaderError> {
    if buffer.len() < FIXED_HEADER_LEN {
        return Err(HeaderError::BufferTooShort { have: buffer.len(), need: FIXED_HEADER_LEN });
    }

    let security = SecurityInfo {
        epoch: read_key_epoch(buffer),
        encryption_alg: buffer[offsets::ENCRYPTION_ALG],
        mac_alg: buffer[offsets::MAC_ALG],
    };

    let apdu_length = decode_u16(buffer, offsets::APDU_LENGTH);
    let pdu_len = (apdu_length as usize).saturating_sub(APDU_LENGTH_BIAS);
    let pdu_end = FIXED_HEADER_LEN + pdu_len;

    let (goose_pdu, signature) = if pdu_end > buffer.len() {
        (
            buffer[FIXED_HEADER_LEN..].to_vec(),
            SignatureRegion::Malformed {
                reason: format!(
                    "GOOSE PDU truncated: APDU length {} needs {} bytes, {} available",
                    apdu_length,
                    pdu_len,
                    buffer.len() - FIXED_HEADER_LEN
                ),
            },
        )
    } else {
        (buffer[FIXED_HEADER_LEN..pdu_end].to_vec(), dissect_signature(&buffer[pdu_end..]))
    };

    Ok(RGooseHeader {
        length_indicator: buffer[offsets::LENGTH_INDICATOR],
        type_indicator: buffer[offsets::TYPE_INDICATOR],
        session_identifier: buffer[offsets::SESSION_IDENTIFIER],
        header_li: buffer[offsets::HEADER_LI],
        common_header: buffer[offsets::COMMON_HEADER],
        common_header_li: buffer[offsets::COMMON_HEADER_LI],
        spdu_length: decode_u32(buffer, offsets::SPDU_LENGTH),
        spdu_number: decode_u32(buffer, offsets::SPDU_NUMBER),
        version_number: decode_u16(buffer, offsets::VERSION_NUMBER),
        security,
        session_payload_length: decode_u32(buffer, offsets::SESSION_PAYLOAD_LENGTH),
        payload_type: buffer[offsets::PAYLOAD_TYPE],
        simulation: buffer[offsets::SIMULATION],
        appid: decode_u16(buffer, offsets::APPID),
        apdu_length,
        goose_pdu,
        signature,
        buffer_len: buffer.len(),
    })
}

fn dissect_signature(tail: &[u8]) -> SignatureRegion {
    match tail {
        [] => SignatureRegion::Absent,
        [_] => SignatureRegion::Malformed {
            reason: "signature length byte missing".into(),
        },
        [marker, length, tag @ ..] => {
            if *length == 0 && tag.is_empty() {
                SignatureRegion::Unsecured { marker: *marker }
            } else if tag.len() == *length as usize {
                SignatureRegion::Tagged { marker: *marker, length: *length, tag: tag.to_vec() }
            } else {
                SignatureRegion::Malformed {
                    reason: format!(
                        "signature length {} but {} trailing bytes",
                        length,
                        tag.len()
                    ),
                }
            }
        }
    }
}
