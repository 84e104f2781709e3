//! rgoose-core
//!
//! R-GOOSE message security: tag insertion and validation (HMAC, GMAC),
//! in-place payload encryption (AES-GCM), and the wire layout codec.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;

pub mod headers;
pub mod crypto;
pub mod security;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::constants::{enc_ids, mac_ids, offsets, MAC_SIZES};
    pub use crate::crypto::{
        derive_iv, generate_base_iv, iv_for_message, iv_from_slice, AeadProvider, CryptoError,
        GcmTag, MacProvider, RustCryptoProvider, GCM_TAG_LEN, IV_LEN_12,
    };
    pub use crate::headers::{
        dissect, EncryptionAlgorithm, HeaderError, KeyEpoch, MacAlgorithm, MacFamily,
        RGooseFields, RGooseHeader, SignatureRegion,
    };
    pub use crate::security::{authenticated_range, RGooseMessage, SecurityEngine};
    pub use crate::types::{DecryptOutcome, EncryptOutcome, SecurityError, Verification};
    pub use crate::utils::parse_hex;
}
