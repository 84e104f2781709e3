//! headers/types.rs
//! Algorithm registry, header field views and layout errors.
//!
//! Notes:
//! - The registry is a static table (`MAC_SIZES`); nothing here is mutable at runtime.
//! - `RGooseHeader` is the structured result of the dissector. It is a copy of the
//!   wire fields, never a live view, so it stays valid after the message is mutated.

use std::fmt;

use num_enum::TryFromPrimitive;
use serde::Serialize;
use thiserror::Error;

use crate::constants::{enc_ids, mac_ids, MAC_SIZES};
use crate::constants::{
    DEFAULT_COMMON_HEADER, DEFAULT_COMMON_HEADER_LI, DEFAULT_HEADER_LI, DEFAULT_LI,
    DEFAULT_PAYLOAD_TYPE, DEFAULT_SESSION_IDENTIFIER, DEFAULT_TI, DEFAULT_VERSION_NUMBER,
};
use crate::utils::enum_name_or_hex;

/// Which primitive computes a MAC algorithm's tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum MacFamily {
    /// Keyed-hash MAC (SHA-256 or BLAKE2).
    Hmac,
    /// AES-GCM tag over AAD only, with an empty plaintext.
    Gmac,
}

impl fmt::Display for MacFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacFamily::Hmac => write!(f, "HMAC"),
            MacFamily::Gmac => write!(f, "GMAC"),
        }
    }
}

/// MAC algorithms carried in the MacAlgorithmId field.
///
/// `MAC_NONE` (0) is deliberately not a variant: an unsecured message has no algorithm.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize)]
pub enum MacAlgorithm {
    HmacSha256_80  = mac_ids::HMAC_SHA256_80,
    HmacSha256_128 = mac_ids::HMAC_SHA256_128,
    HmacSha256_256 = mac_ids::HMAC_SHA256_256,
    GmacAes256_64  = mac_ids::GMAC_AES256_64,
    GmacAes256_128 = mac_ids::GMAC_AES256_128,
    HmacBlake2b80  = mac_ids::HMAC_BLAKE2B_80,
    HmacBlake2s80  = mac_ids::HMAC_BLAKE2S_80,
    GmacAes128_64  = mac_ids::GMAC_AES128_64,
    GmacAes128_128 = mac_ids::GMAC_AES128_128,
}

impl MacAlgorithm {
    /// Every registered algorithm, in id order.
    pub const ALL: [MacAlgorithm; 9] = [
        MacAlgorithm::HmacSha256_80,
        MacAlgorithm::HmacSha256_128,
        MacAlgorithm::HmacSha256_256,
        MacAlgorithm::GmacAes256_64,
        MacAlgorithm::GmacAes256_128,
        MacAlgorithm::HmacBlake2b80,
        MacAlgorithm::HmacBlake2s80,
        MacAlgorithm::GmacAes128_64,
        MacAlgorithm::GmacAes128_128,
    ];

    /// Look up a wire id. `MAC_NONE` and unregistered ids are both rejected.
    pub fn verify(raw: u8) -> Result<Self, HeaderError> {
        MacAlgorithm::try_from(raw).map_err(|_| HeaderError::UnknownMacAlgorithm { raw })
    }

    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Tag length in bytes, from the registry.
    #[inline]
    pub const fn tag_len(self) -> usize {
        MAC_SIZES[self as usize]
    }

    pub const fn family(self) -> MacFamily {
        match self {
            MacAlgorithm::HmacSha256_80
            | MacAlgorithm::HmacSha256_128
            | MacAlgorithm::HmacSha256_256
            | MacAlgorithm::HmacBlake2b80
            | MacAlgorithm::HmacBlake2s80 => MacFamily::Hmac,
            MacAlgorithm::GmacAes256_64
            | MacAlgorithm::GmacAes256_128
            | MacAlgorithm::GmacAes128_64
            | MacAlgorithm::GmacAes128_128 => MacFamily::Gmac,
        }
    }
}

/// AEAD algorithms carried in the EncryptionAlgorithmId field. 0 means plaintext.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize)]
pub enum EncryptionAlgorithm {
    Aes128Gcm = enc_ids::AES_128_GCM,
    Aes256Gcm = enc_ids::AES_256_GCM,
}

impl EncryptionAlgorithm {
    pub const ALL: [EncryptionAlgorithm; 2] =
        [EncryptionAlgorithm::Aes128Gcm, EncryptionAlgorithm::Aes256Gcm];

    pub fn verify(raw: u8) -> Result<Self, HeaderError> {
        EncryptionAlgorithm::try_from(raw)
            .map_err(|_| HeaderError::UnknownEncryptionAlgorithm { raw })
    }

    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// AES key length the cipher expects.
    pub const fn key_len(self) -> usize {
        match self {
            EncryptionAlgorithm::Aes128Gcm => 16,
            EncryptionAlgorithm::Aes256Gcm => 32,
        }
    }
}

/// Key-epoch fields stamped into the Security-Information block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KeyEpoch {
    pub time_of_current_key: u32,
    pub time_to_next_key: u16,
    pub key_id: u32,
}

impl KeyEpoch {
    pub fn new(time_of_current_key: u32, time_to_next_key: u16, key_id: u32) -> Self {
        Self { time_of_current_key, time_to_next_key, key_id }
    }
}

/// Security-Information block as found on the wire (offsets 16..28).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SecurityInfo {
    #[serde(flatten)]
    pub epoch: KeyEpoch,
    pub encryption_alg: u8,
    pub mac_alg: u8,
}

/// Decoded state of the bytes following the GOOSE PDU.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SignatureRegion {
    /// Nothing follows the PDU.
    Absent,
    /// Signature marker present with a zero SignatureLength.
    Unsecured { marker: u8 },
    /// Signature marker, SignatureLength and exactly that many tag bytes.
    Tagged {
        marker: u8,
        length: u8,
        #[serde(serialize_with = "crate::utils::serialize_hex")]
        tag: Vec<u8>,
    },
    /// Anything else: truncated PDU, missing length byte, length/tail disagreement.
    Malformed { reason: String },
}

/// Structured view of every R-GOOSE field (dissector output).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RGooseHeader {
    pub length_indicator: u8,
    pub type_indicator: u8,
    pub session_identifier: u8,
    pub header_li: u8,
    pub common_header: u8,
    pub common_header_li: u8,
    pub spdu_length: u32,
    pub spdu_number: u32,
    pub version_number: u16,
    pub security: SecurityInfo,
    pub session_payload_length: u32,
    pub payload_type: u8,
    pub simulation: u8,
    pub appid: u16,
    pub apdu_length: u16,
    #[serde(serialize_with = "crate::utils::serialize_hex")]
    pub goose_pdu: Vec<u8>,
    pub signature: SignatureRegion,
    /// Actual buffer length the view was decoded from.
    pub buffer_len: usize,
}

impl RGooseHeader {
    /// `SpduLength + 10`: the message size the header claims.
    pub fn declared_size(&self) -> usize {
        self.spdu_length as usize + crate::constants::SPDU_LENGTH_BIAS
    }

    pub fn mac_algorithm(&self) -> Option<MacAlgorithm> {
        MacAlgorithm::try_from(self.security.mac_alg).ok()
    }

    pub fn encryption_algorithm(&self) -> Option<EncryptionAlgorithm> {
        EncryptionAlgorithm::try_from(self.security.encryption_alg).ok()
    }

    pub fn is_consistent(&self) -> bool {
        self.declared_size() == self.buffer_len
            && !matches!(self.signature, SignatureRegion::Malformed { .. })
    }
}

impl fmt::Display for RGooseHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "R-GOOSE message ({} bytes)", self.buffer_len)?;
        writeln!(f, "  Session header")?;
        writeln!(f, "    LI                     : 0x{:02x}", self.length_indicator)?;
        writeln!(f, "    TI                     : 0x{:02x}", self.type_indicator)?;
        writeln!(f, "    Session identifier     : 0x{:02x}", self.session_identifier)?;
        writeln!(f, "    Header LI              : 0x{:02x}", self.header_li)?;
        writeln!(f, "    Common header          : 0x{:02x}", self.common_header)?;
        writeln!(f, "    Common header LI       : 0x{:02x}", self.common_header_li)?;
        writeln!(f, "    SPDU length            : {} (message size {})", self.spdu_length, self.declared_size())?;
        writeln!(f, "    SPDU number            : {}", self.spdu_number)?;
        writeln!(f, "    Version                : {}", self.version_number)?;
        writeln!(f, "  Security information")?;
        writeln!(f, "    Time of current key    : {}", self.security.epoch.time_of_current_key)?;
        writeln!(f, "    Time to next key       : {}", self.security.epoch.time_to_next_key)?;
        writeln!(
            f,
            "    Encryption algorithm   : {}",
            if self.security.encryption_alg == enc_ids::NONE {
                "None".to_string()
            } else {
                enum_name_or_hex::<EncryptionAlgorithm>(self.security.encryption_alg)
            }
        )?;
        writeln!(
            f,
            "    MAC algorithm          : {}",
            if self.security.mac_alg == mac_ids::MAC_NONE {
                "None".to_string()
            } else {
                enum_name_or_hex::<MacAlgorithm>(self.security.mac_alg)
            }
        )?;
        writeln!(f, "    Key ID                 : {}", self.security.epoch.key_id)?;
        writeln!(f, "  Session user information")?;
        writeln!(f, "    Payload length         : {}", self.session_payload_length)?;
        writeln!(f, "    Payload type           : 0x{:02x}", self.payload_type)?;
        writeln!(f, "    Simulation             : {}", self.simulation)?;
        writeln!(f, "    APPID                  : 0x{:04x}", self.appid)?;
        writeln!(f, "    APDU length            : {}", self.apdu_length)?;
        writeln!(f, "    GOOSE PDU ({} bytes)   : {}", self.goose_pdu.len(), hex::encode(&self.goose_pdu))?;
        match &self.signature {
            SignatureRegion::Absent => writeln!(f, "  Signature              : absent"),
            SignatureRegion::Unsecured { marker } => {
                writeln!(f, "  Signature              : none (marker 0x{:02x}, length 0)", marker)
            }
            SignatureRegion::Tagged { marker, length, tag } => writeln!(
                f,
                "  Signature              : marker 0x{:02x}, length {}, tag {}",
                marker,
                length,
                hex::encode(tag)
            ),
            SignatureRegion::Malformed { reason } => {
                writeln!(f, "  Signature              : malformed ({})", reason)
            }
        }
    }
}

/// Header field values used to build an unsecured message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RGooseFields {
    pub length_indicator: u8,
    pub type_indicator: u8,
    pub session_identifier: u8,
    pub header_li: u8,
    pub common_header: u8,
    pub common_header_li: u8,
    pub spdu_number: u32,
    pub version_number: u16,
    pub epoch: KeyEpoch,
    pub payload_type: u8,
    pub simulation: u8,
    pub appid: u16,
}

impl Default for RGooseFields {
    fn default() -> Self {
        Self {
            length_indicator: DEFAULT_LI,
            type_indicator: DEFAULT_TI,
            session_identifier: DEFAULT_SESSION_IDENTIFIER,
            header_li: DEFAULT_HEADER_LI,
            common_header: DEFAULT_COMMON_HEADER,
            common_header_li: DEFAULT_COMMON_HEADER_LI,
            spdu_number: 0,
            version_number: DEFAULT_VERSION_NUMBER,
            epoch: KeyEpoch::default(),
            payload_type: DEFAULT_PAYLOAD_TYPE,
            simulation: 0,
            appid: 0x0001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// Buffer too short to contain the fixed header or signature fields.
    #[error("message buffer too short: {have} < {need}")]
    BufferTooShort { have: usize, need: usize },

    /// SpduLength + 10 does not match the buffer length.
    #[error("SPDU length mismatch: header declares {declared} bytes, buffer holds {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// ApduLength leaves no room for the PDU inside the message body.
    #[error("invalid APDU length {apdu_length}: PDU must fit in {available} bytes")]
    InvalidApduLength { apdu_length: u16, available: usize },

    /// ApduLength ends the PDU short of the signature pair.
    #[error("APDU length {apdu_length} ends the PDU at {pdu_end}, signature pair starts at {signature_at}")]
    PduExtentMismatch { apdu_length: u16, pdu_end: usize, signature_at: usize },

    /// GOOSE PDU longer than ApduLength can express.
    #[error("GOOSE PDU of {len} bytes does not fit the APDU length field")]
    PduTooLarge { len: usize },

    /// SignatureLength byte disagrees with the registry or with the trailing bytes.
    #[error("signature length mismatch: expected {expected}, found {found}")]
    SignatureLengthMismatch { expected: usize, found: usize },

    #[error("unknown MAC algorithm: {}", enum_name_or_hex::<MacAlgorithm>(*raw))]
    UnknownMacAlgorithm { raw: u8 },

    #[error("unknown encryption algorithm: {}", enum_name_or_hex::<EncryptionAlgorithm>(*raw))]
    UnknownEncryptionAlgorithm { raw: u8 },

    /// Declared message size does not fit the 32-bit SpduLength field.
    #[error("message size {size} overflows the SPDU length field")]
    SizeOverflow { size: usize },
}
