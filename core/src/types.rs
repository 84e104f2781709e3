use std::fmt;

use thiserror::Error;

use crate::crypto::{CryptoError, GcmTag};
use crate::headers::{EncryptionAlgorithm, HeaderError, MacAlgorithm, MacFamily};
use crate::utils::enum_name_or_hex;

/// Unified error for the message security engine.
/// - `From<HeaderError>` and `From<CryptoError>` let `?` flow from the lower layers.
/// - Unknown registry ids from either field collapse into `UnknownAlgorithm`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// Algorithm id outside the registry. No crypto call was attempted.
    #[error("unknown algorithm id 0x{raw:02x}")]
    UnknownAlgorithm { raw: u8 },

    /// Registered MAC id used with the other family's operation.
    #[error("{} is not a {expected} algorithm", enum_name_or_hex::<MacAlgorithm>(alg.id()))]
    WrongMacFamily { alg: MacAlgorithm, expected: MacFamily },

    /// Buffer growth impossible; the message is unchanged.
    #[error("cannot grow message to {requested} bytes")]
    AllocationFailure { requested: usize },

    /// AEAD integrity check failed; the payload is not trustworthy.
    #[error("payload authentication failed ({alg:?})")]
    AuthenticationFailure { alg: EncryptionAlgorithm },

    /// Declared lengths inconsistent with the buffer.
    #[error("malformed message: {0}")]
    MalformedMessage(HeaderError),

    /// Payload already carries a non-zero EncryptionAlgorithmId.
    #[error("payload already encrypted with {}", enum_name_or_hex::<EncryptionAlgorithm>(*alg))]
    AlreadyEncrypted { alg: u8 },

    /// Provider error (key/IV length, primitive failure).
    #[error("crypto error: {0}")]
    Crypto(CryptoError),
}

impl From<HeaderError> for SecurityError {
    fn from(e: HeaderError) -> Self {
        match e {
            HeaderError::UnknownMacAlgorithm { raw } => SecurityError::UnknownAlgorithm { raw },
            HeaderError::UnknownEncryptionAlgorithm { raw } => SecurityError::UnknownAlgorithm { raw },
            other => SecurityError::MalformedMessage(other),
        }
    }
}

impl From<CryptoError> for SecurityError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::AuthenticationFailure { alg } => SecurityError::AuthenticationFailure { alg },
            other => SecurityError::Crypto(other),
        }
    }
}

/// Four-way outcome of tag validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Recomputed tag equals the stored tag.
    Valid,
    /// Tag mismatch, or a tamper signal in the signature fields.
    Invalid,
    /// No MAC algorithm and no tag: the message legitimately carries no signature.
    Unsecured,
    /// Validation could not be carried out.
    Error(SecurityError),
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Valid => write!(f, "valid"),
            Verification::Invalid => write!(f, "invalid"),
            Verification::Unsecured => write!(f, "unsecured"),
            Verification::Error(e) => write!(f, "error: {}", e),
        }
    }
}

/// Result of payload encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptOutcome {
    /// Algorithm none: EncryptionAlgorithmId cleared, payload untouched.
    NoOp,
    /// Payload encrypted in place. `tag` must be kept to decrypt.
    Encrypted { alg: EncryptionAlgorithm, tag: GcmTag },
}

/// Result of payload decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// Header says the payload is plaintext.
    NoOp,
    Decrypted { alg: EncryptionAlgorithm },
}
