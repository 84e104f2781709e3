use thiserror::Error;

use crate::headers::{EncryptionAlgorithm, MacAlgorithm};
use crate::utils::fmt_bytes;

/// AES-GCM IV length (bytes).
pub const IV_LEN_12: usize = 12;

/// Full AES-GCM tag length (bytes).
pub const GCM_TAG_LEN: usize = 16;

/// Detached AES-GCM tag produced by payload encryption.
pub type GcmTag = [u8; GCM_TAG_LEN];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key length the cipher cannot use.
    #[error("invalid key length: expected={expected}, actual={actual}")]
    InvalidKeyLen { expected: usize, actual: usize },

    /// IV length mismatch (must be 12 bytes).
    #[error("invalid IV length: expected={expected}, actual={actual}")]
    InvalidIvLen { expected: usize, actual: usize },

    /// All-zero base IV passed to IV derivation.
    #[error("invalid base IV: {}", fmt_bytes(.0))]
    InvalidBaseIv([u8; IV_LEN_12]),

    /// Buffer too short to hold the SpduNumber an IV is derived from.
    #[error("message too short for IV derivation: {have} < {need}")]
    MessageTooShort { have: usize, need: usize },

    /// GMAC algorithm invoked without an IV.
    #[error("{alg:?} requires a 12-byte IV")]
    MissingIv { alg: MacAlgorithm },

    /// AEAD tag mismatch on decryption; the payload must not be trusted.
    #[error("AEAD authentication failed ({alg:?})")]
    AuthenticationFailure { alg: EncryptionAlgorithm },

    /// Provider returned a tag of the wrong size.
    #[error("{alg:?} produced {actual} tag bytes, registry expects {expected}")]
    TagLength { alg: MacAlgorithm, expected: usize, actual: usize },

    /// General runtime error with context.
    #[error("crypto failure: {0}")]
    Failure(String),
}
