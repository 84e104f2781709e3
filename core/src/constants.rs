//! constants.rs
//! Wire layout descriptor and algorithm identifiers for R-GOOSE messages.
//!
//! All offsets are absolute from the start of the message buffer (first LI byte).
//! All multi-byte integers on the wire are big-endian.

/// Byte offsets of every fixed R-GOOSE field.
pub mod offsets {
    pub const LENGTH_INDICATOR: usize       = 0;
    pub const TYPE_INDICATOR: usize         = 1;
    pub const SESSION_IDENTIFIER: usize     = 2;
    pub const HEADER_LI: usize              = 3;
    pub const COMMON_HEADER: usize          = 4;
    pub const COMMON_HEADER_LI: usize       = 5;
    pub const SPDU_LENGTH: usize            = 6;
    pub const SPDU_NUMBER: usize            = 10;
    pub const VERSION_NUMBER: usize         = 14;
    pub const TIME_OF_CURRENT_KEY: usize    = 16;
    pub const TIME_TO_NEXT_KEY: usize       = 20;
    pub const ENCRYPTION_ALG: usize         = 22;
    pub const MAC_ALG: usize                = 23;
    pub const KEY_ID: usize                 = 24;
    pub const SESSION_PAYLOAD_LENGTH: usize = 28;
    pub const PAYLOAD_TYPE: usize           = 32;
    pub const SIMULATION: usize             = 33;
    pub const APPID: usize                  = 34;
    pub const APDU_LENGTH: usize            = 36;
    pub const GOOSE_PDU: usize              = 38;
}

/// Bytes preceding the SPDU payload that `SpduLength` does not count
/// (LI, TI, SI, LI, CH, LI and the SpduLength field itself).
pub const SPDU_LENGTH_BIAS: usize = 10;

/// Leading session-header bytes (LI, TI) excluded from the authenticated range.
pub const AUTH_PREFIX_LEN: usize = 2;

/// SignatureTag + SignatureLength.
pub const SIGNATURE_FIELDS_LEN: usize = 2;

/// Bytes of `ApduLength` that are not GOOSE PDU content.
pub const APDU_LENGTH_BIAS: usize = 2;

/// Marker byte carried in the SignatureTag field.
pub const SIGNATURE_TAG: u8 = 0x85;

/// Fixed header up to (not including) the GOOSE PDU.
pub const FIXED_HEADER_LEN: usize = offsets::GOOSE_PDU;

/// Smallest well-formed message: fixed header, empty PDU, signature pair.
pub const MIN_MESSAGE_LEN: usize = FIXED_HEADER_LEN + SIGNATURE_FIELDS_LEN;

/// Session-header framing defaults used by the message builder.
pub const DEFAULT_LI: u8 = 0x01;
pub const DEFAULT_TI: u8 = 0x40;
pub const DEFAULT_SESSION_IDENTIFIER: u8 = 0xA1;
pub const DEFAULT_HEADER_LI: u8 = 0x18;
pub const DEFAULT_COMMON_HEADER: u8 = 0x80;
pub const DEFAULT_COMMON_HEADER_LI: u8 = 0x16;
pub const DEFAULT_VERSION_NUMBER: u16 = 0x0002;
pub const DEFAULT_PAYLOAD_TYPE: u8 = 0x81;

/// MAC algorithm identifiers (MacAlgorithmId field).
pub mod mac_ids {
    pub const MAC_NONE: u8         = 0;
    pub const HMAC_SHA256_80: u8   = 1;
    pub const HMAC_SHA256_128: u8  = 2;
    pub const HMAC_SHA256_256: u8  = 3;
    pub const GMAC_AES256_64: u8   = 4;
    pub const GMAC_AES256_128: u8  = 5;
    pub const HMAC_BLAKE2B_80: u8  = 6;
    pub const HMAC_BLAKE2S_80: u8  = 7;
    pub const GMAC_AES128_64: u8   = 8;
    pub const GMAC_AES128_128: u8  = 9;
}

/// Tag length in bytes, indexed by MAC algorithm id.
pub const MAC_SIZES: [usize; 10] = [0, 10, 16, 32, 8, 16, 10, 10, 8, 16];

/// Encryption algorithm identifiers (EncryptionAlgorithmId field).
pub mod enc_ids {
    pub const NONE: u8        = 0;
    pub const AES_128_GCM: u8 = 1;
    pub const AES_256_GCM: u8 = 2;
}
