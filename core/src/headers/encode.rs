//! headers/encode.rs
//!
//! Field codec (write side) and the unsecured-message builder.
//!
//! Design notes:
//! - All writes are big-endian, fixed width, at absolute offsets.
//! - No bounds checking: callers size the buffer first (the security engine
//!   only writes into buffers it has validated or grown itself).

use byteorder::{BigEndian, ByteOrder};

use crate::constants::offsets;
use crate::constants::{
    APDU_LENGTH_BIAS, FIXED_HEADER_LEN, SIGNATURE_FIELDS_LEN, SIGNATURE_TAG, SPDU_LENGTH_BIAS,
};
use crate::headers::types::{HeaderError, KeyEpoch, RGooseFields};

/// Write `value` as 2 big-endian bytes at `offset`.
#[inline]
pub fn encode_u16(buffer: &mut [u8], value: u16, offset: usize) {
    BigEndian::write_u16(&mut buffer[offset..offset + 2], value);
}

/// Write `value` as 4 big-endian bytes at `offset`.
#[inline]
pub fn encode_u32(buffer: &mut [u8], value: u32, offset: usize) {
    BigEndian::write_u32(&mut buffer[offset..offset + 4], value);
}

/// Stamp TimeOfCurrentKey, TimeToNextKey and KeyId.
/// The two algorithm bytes between them are left alone.
#[inline]
pub fn write_key_epoch(buffer: &mut [u8], epoch: &KeyEpoch) {
    encode_u32(buffer, epoch.time_of_current_key, offsets::TIME_OF_CURRENT_KEY);
    encode_u16(buffer, epoch.time_to_next_key, offsets::TIME_TO_NEXT_KEY);
    encode_u32(buffer, epoch.key_id, offsets::KEY_ID);
}

/// Set SpduLength so that `SpduLength + 10 == total_len`.
#[inline]
pub fn write_spdu_length(buffer: &mut [u8], total_len: usize) -> Result<(), HeaderError> {
    let spdu_len = total_len
        .checked_sub(SPDU_LENGTH_BIAS)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or(HeaderError::SizeOverflow { size: total_len })?;
    encode_u32(buffer, spdu_len, offsets::SPDU_LENGTH);
    Ok(())
}

/// Build a well-formed unsecured R-GOOSE message around `goose_pdu`.
///
/// Layout: fixed 38-byte header, the PDU, SignatureTag (0x85), SignatureLength (0).
/// Both algorithm ids are written as none.
pub fn build_message(fields: &RGooseFields, goose_pdu: &[u8]) -> Result<Vec<u8>, HeaderError> {
    let apdu_length = u16::try_from(goose_pdu.len() + APDU_LENGTH_BIAS)
        .map_err(|_| HeaderError::PduTooLarge { len: goose_pdu.len() })?;

    let total = FIXED_HEADER_LEN + goose_pdu.len() + SIGNATURE_FIELDS_LEN;
    let mut out = vec![0u8; total];

    out[offsets::LENGTH_INDICATOR] = fields.length_indicator;
    out[offsets::TYPE_INDICATOR] = fields.type_indicator;
    out[offsets::SESSION_IDENTIFIER] = fields.session_identifier;
    out[offsets::HEADER_LI] = fields.header_li;
    out[offsets::COMMON_HEADER] = fields.common_header;
    out[offsets::COMMON_HEADER_LI] = fields.common_header_li;
    write_spdu_length(&mut out, total)?;
    encode_u32(&mut out, fields.spdu_number, offsets::SPDU_NUMBER);
    encode_u16(&mut out, fields.version_number, offsets::VERSION_NUMBER);
    write_key_epoch(&mut out, &fields.epoch);
    // algorithm ids stay zero

    // Session user information: PayloadType .. end of PDU.
    let sui_len = (total - SIGNATURE_FIELDS_LEN - offsets::PAYLOAD_TYPE) as u32;
    encode_u32(&mut out, sui_len, offsets::SESSION_PAYLOAD_LENGTH);
    out[offsets::PAYLOAD_TYPE] = fields.payload_type;
    out[offsets::SIMULATION] = fields.simulation;
    encode_u16(&mut out, fields.appid, offsets::APPID);
    encode_u16(&mut out, apdu_length, offsets::APDU_LENGTH);

    out[FIXED_HEADER_LEN..FIXED_HEADER_LEN + goose_pdu.len()].copy_from_slice(goose_pdu);

    let sig = FIXED_HEADER_LEN + goose_pdu.len();
    out[sig] = SIGNATURE_TAG;
    out[sig + 1] = 0;

    debug_assert_eq!(out.len(), total, "builder wrote incorrect length");
    Ok(out)
}
