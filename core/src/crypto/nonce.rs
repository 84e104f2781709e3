//! crypto/nonce.rs
//! Counter-derived 12-byte IVs for GMAC tags and payload encryption.
//!
//! Scheme (TLS-style): start from a random per-key base IV and XOR its low
//! 8 bytes with a big-endian counter. Using the message's SpduNumber as the
//! counter gives one IV per message for as long as SpduNumber does not wrap
//! under the same key.
//!
//! Never reuse a (key, IV) pair with AES-GCM. Rotate the key before the
//! counter repeats.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::constants::offsets;
use crate::crypto::types::{CryptoError, IV_LEN_12};
use crate::headers::decode_u32;

/// Derive an IV from `base_iv` and `counter`.
///
/// `base_iv[0..4]` stays fixed; `base_iv[4..12]` is XORed with `counter` (big-endian).
/// Same `(base_iv, counter)` always gives the same IV.
#[inline]
pub fn derive_iv(base_iv: &[u8; IV_LEN_12], counter: u64) -> Result<[u8; IV_LEN_12], CryptoError> {
    validate_base_iv(base_iv)?;

    let mut iv = *base_iv;
    for (b, c) in iv[4..].iter_mut().zip(counter.to_be_bytes()) {
        *b ^= c;
    }
    Ok(iv)
}

/// End of the SpduNumber field.
const SPDU_NUMBER_END: usize = offsets::SPDU_NUMBER + 4;

/// Derive the IV for a message from its SpduNumber field.
pub fn iv_for_message(base_iv: &[u8; IV_LEN_12], message: &[u8]) -> Result<[u8; IV_LEN_12], CryptoError> {
    if message.len() < SPDU_NUMBER_END {
        return Err(CryptoError::MessageTooShort { have: message.len(), need: SPDU_NUMBER_END });
    }
    let spdu_number = decode_u32(message, offsets::SPDU_NUMBER);
    derive_iv(base_iv, u64::from(spdu_number))
}

/// Fresh random base IV from the OS RNG.
pub fn generate_base_iv() -> [u8; IV_LEN_12] {
    let mut iv = [0u8; IV_LEN_12];
    loop {
        OsRng.fill_bytes(&mut iv);
        if validate_base_iv(&iv).is_ok() {
            return iv;
        }
    }
}

/// Reject the all-zero base IV.
#[inline]
pub fn validate_base_iv(base_iv: &[u8; IV_LEN_12]) -> Result<(), CryptoError> {
    if base_iv.iter().all(|&b| b == 0) {
        return Err(CryptoError::InvalidBaseIv(*base_iv));
    }
    Ok(())
}

/// Convert caller IV bytes to the fixed-size array the ciphers take.
#[inline]
pub fn iv_from_slice(iv: &[u8]) -> Result<[u8; IV_LEN_12], CryptoError> {
    <[u8; IV_LEN_12]>::try_from(iv)
        .map_err(|_| CryptoError::InvalidIvLen { expected: IV_LEN_12, actual: iv.len() })
}
