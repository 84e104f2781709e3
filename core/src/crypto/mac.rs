//! crypto/mac.rs
//! Tag computation for the MacAlgorithmId registry.
//!
//! Design notes:
//! - HMAC-SHA256 variants truncate the 32-byte HMAC output to 10, 16 or 32 bytes.
//! - HMAC-BLAKE2 variants use the standard HMAC construction over BLAKE2b-512 /
//!   BLAKE2s-256 (block sizes 128 / 64) and truncate to 10 bytes.
//! - GMAC variants run AES-GCM with the protected bytes as AAD and an empty
//!   plaintext, then truncate the 16-byte GCM tag to 8 or 16 bytes.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use blake2::{Blake2b512, Blake2s256};
use hmac::{Hmac, Mac, SimpleHmac};
use sha2::Sha256;

use crate::crypto::types::{CryptoError, IV_LEN_12};
use crate::headers::MacAlgorithm;

/// Capability to compute registry-sized MAC tags.
///
/// Implementations must be deterministic and side-effect free.
pub trait MacProvider {
    /// Compute the tag of `alg` over `data`. The result is exactly `alg.tag_len()` bytes.
    /// `iv` is required by the GMAC family and ignored by HMAC.
    fn compute_mac(
        &self,
        alg: MacAlgorithm,
        key: &[u8],
        iv: Option<&[u8; IV_LEN_12]>,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;
}

/// Compute a tag with the RustCrypto primitives.
pub fn compute_tag(
    alg: MacAlgorithm,
    key: &[u8],
    iv: Option<&[u8; IV_LEN_12]>,
    data: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut full = match alg {
        MacAlgorithm::HmacSha256_80
        | MacAlgorithm::HmacSha256_128
        | MacAlgorithm::HmacSha256_256 => keyed_digest::<Hmac<Sha256>>(key, data)?,
        MacAlgorithm::HmacBlake2b80 => keyed_digest::<SimpleHmac<Blake2b512>>(key, data)?,
        MacAlgorithm::HmacBlake2s80 => keyed_digest::<SimpleHmac<Blake2s256>>(key, data)?,
        MacAlgorithm::GmacAes128_64 | MacAlgorithm::GmacAes128_128 => {
            let iv = iv.ok_or(CryptoError::MissingIv { alg })?;
            let cipher = Aes128Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::InvalidKeyLen { expected: 16, actual: key.len() })?;
            gmac(&cipher, iv, data)?
        }
        MacAlgorithm::GmacAes256_64 | MacAlgorithm::GmacAes256_128 => {
            let iv = iv.ok_or(CryptoError::MissingIv { alg })?;
            let cipher = Aes256Gcm::new_from_slice(key)
                .map_err(|_| CryptoError::InvalidKeyLen { expected: 32, actual: key.len() })?;
            gmac(&cipher, iv, data)?
        }
    };

    full.truncate(alg.tag_len());
    Ok(full)
}

fn keyed_digest<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|_| CryptoError::Failure("HMAC key rejected".into()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn gmac<C: AeadInPlace<NonceSize = U12>>(cipher: &C, iv: &[u8; IV_LEN_12], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut empty: [u8; 0] = [];
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut empty)
        .map_err(|_| CryptoError::Failure("GMAC computation failed".into()))?;
    Ok(tag.to_vec())
}
