//! security/message.rs
//! Owned R-GOOSE message buffer and the size bookkeeping shared by the transforms.
//!
//! Design notes:
//! - `RGooseMessage` owns its bytes. Growth replaces the inner buffer, and because
//!   every transform takes `&mut RGooseMessage`, no borrowed view of the old
//!   bytes can survive a resize.
//! - Construction does not validate: the dissector must work on broken input.
//!   Each transform validates lengths before using them as offsets.

use std::ops::Range;

use log::warn;

use crate::constants::{mac_ids, offsets, AUTH_PREFIX_LEN, MIN_MESSAGE_LEN, SIGNATURE_FIELDS_LEN};
use crate::headers::{build_message, check_declared_size, dissect, goose_pdu_range};
use crate::headers::{HeaderError, MacAlgorithm, RGooseFields, RGooseHeader};
use crate::types::SecurityError;

/// One R-GOOSE message, exclusively owned by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RGooseMessage {
    buf: Vec<u8>,
}

impl RGooseMessage {
    /// Wrap raw bytes (from a socket, file or fixture).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { buf: bytes }
    }

    /// Build a well-formed unsecured message around `goose_pdu`.
    pub fn build(fields: &RGooseFields, goose_pdu: &[u8]) -> Result<Self, HeaderError> {
        build_message(fields, goose_pdu).map(Self::from_bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Structured read-only view of every field.
    pub fn dissect(&self) -> Result<RGooseHeader, HeaderError> {
        dissect(&self.buf)
    }

    #[inline]
    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Swap in a grown buffer. The previous allocation is released.
    #[inline]
    pub(crate) fn replace(&mut self, grown: Vec<u8>) {
        self.buf = grown;
    }
}

impl From<Vec<u8>> for RGooseMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl AsRef<[u8]> for RGooseMessage {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

/// Bytes covered by the MAC for an untagged message of `body_len` bytes:
/// SessionIdentifier through the last GOOSE PDU byte, i.e. `[2, body_len - 2)`.
///
/// `body_len` must be at least `MIN_MESSAGE_LEN`.
#[inline]
pub fn authenticated_range(body_len: usize) -> Range<usize> {
    debug_assert!(body_len >= MIN_MESSAGE_LEN);
    AUTH_PREFIX_LEN..body_len - SIGNATURE_FIELDS_LEN
}

/// Size of the message without its tag, after checking every length involved.
///
/// - `SpduLength + 10` must equal the buffer length.
/// - Under `MAC_NONE` the last byte (SignatureLength) must be zero.
/// - Under a registered MAC id the SignatureLength byte in front of the
///   trailing `L` bytes must equal `L`.
pub(crate) fn untagged_size(buffer: &[u8]) -> Result<usize, SecurityError> {
    let total = check_declared_size(buffer)?;

    let raw = buffer[offsets::MAC_ALG];
    if raw == mac_ids::MAC_NONE {
        let found = buffer[total - 1] as usize;
        if found != 0 {
            return Err(SecurityError::MalformedMessage(HeaderError::SignatureLengthMismatch {
                expected: 0,
                found,
            }));
        }
        return Ok(total);
    }

    let current = MacAlgorithm::verify(raw).map_err(SecurityError::MalformedMessage)?;
    let tag_len = current.tag_len();
    if total < MIN_MESSAGE_LEN + tag_len {
        return Err(SecurityError::MalformedMessage(HeaderError::BufferTooShort {
            have: total,
            need: MIN_MESSAGE_LEN + tag_len,
        }));
    }

    let body = total - tag_len;
    let found = buffer[body - 1] as usize;
    if found != tag_len {
        return Err(SecurityError::MalformedMessage(HeaderError::SignatureLengthMismatch {
            expected: tag_len,
            found,
        }));
    }
    Ok(body)
}

/// Untagged size and GOOSE PDU range, the one well-formedness check shared by
/// tag insertion and payload encryption.
pub(crate) fn checked_layout(buffer: &[u8]) -> Result<(usize, Range<usize>), SecurityError> {
    let layout = untagged_size(buffer)
        .and_then(|body| Ok((body, goose_pdu_range(buffer, body)?)));
    if let Err(e) = &layout {
        warn!("rejecting {}-byte message: {}", buffer.len(), e);
    }
    layout
}
