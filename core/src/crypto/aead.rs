//! crypto/aead.rs
//! AEAD interface for AES-128-GCM and AES-256-GCM payload encryption.
//!
//! Design notes:
//! - GCM is a stream mode: ciphertext length equals plaintext length, so the
//!   GOOSE PDU is rewritten in place and the message never grows.
//! - The 16-byte GCM tag is detached and handed back to the caller.
//! - Tag verification is constant-time and fails closed (no partial plaintext).

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce, Tag};

use crate::crypto::types::{CryptoError, GcmTag, GCM_TAG_LEN, IV_LEN_12};
use crate::headers::EncryptionAlgorithm;

/// Capability to encrypt/decrypt a payload in place without changing its length.
pub trait AeadProvider {
    /// Encrypt `payload` in place, returning the detached authentication tag.
    fn encrypt_in_place(
        &self,
        alg: EncryptionAlgorithm,
        key: &[u8],
        iv: &[u8; IV_LEN_12],
        payload: &mut [u8],
    ) -> Result<GcmTag, CryptoError>;

    /// Verify `tag` and decrypt `payload` in place.
    /// On `AuthenticationFailure` the payload content is unspecified and must be discarded.
    fn decrypt_in_place(
        &self,
        alg: EncryptionAlgorithm,
        key: &[u8],
        iv: &[u8; IV_LEN_12],
        payload: &mut [u8],
        tag: &GcmTag,
    ) -> Result<(), CryptoError>;
}

/// Unified AEAD cipher implementation selected by EncryptionAlgorithmId.
#[derive(Clone)]
pub enum AeadImpl {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl AeadImpl {
    /// Construct the cipher for `alg`, checking the key length it requires.
    pub fn from_alg_and_key(alg: EncryptionAlgorithm, key: &[u8]) -> Result<Self, CryptoError> {
        let expected = alg.key_len();
        if key.len() != expected {
            return Err(CryptoError::InvalidKeyLen { expected, actual: key.len() });
        }

        match alg {
            EncryptionAlgorithm::Aes128Gcm => Aes128Gcm::new_from_slice(key)
                .map(Self::Aes128)
                .map_err(|_| CryptoError::InvalidKeyLen { expected, actual: key.len() }),
            EncryptionAlgorithm::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map(Self::Aes256)
                .map_err(|_| CryptoError::InvalidKeyLen { expected, actual: key.len() }),
        }
    }

    pub fn algorithm(&self) -> EncryptionAlgorithm {
        match self {
            AeadImpl::Aes128(_) => EncryptionAlgorithm::Aes128Gcm,
            AeadImpl::Aes256(_) => EncryptionAlgorithm::Aes256Gcm,
        }
    }

    /// Encrypt in place, returning the detached tag.
    pub fn seal_in_place(
        &self,
        iv: &[u8; IV_LEN_12],
        aad: &[u8],
        buffer: &mut [u8],
    ) -> Result<GcmTag, CryptoError> {
        let nonce = Nonce::from_slice(iv);
        let tag = match self {
            AeadImpl::Aes128(cipher) => cipher.encrypt_in_place_detached(nonce, aad, buffer),
            AeadImpl::Aes256(cipher) => cipher.encrypt_in_place_detached(nonce, aad, buffer),
        }
        .map_err(|_| CryptoError::Failure(format!("{:?} seal failed", self.algorithm())))?;

        let mut out = [0u8; GCM_TAG_LEN];
        out.copy_from_slice(tag.as_slice());
        Ok(out)
    }

    /// Verify the detached tag and decrypt in place.
    pub fn open_in_place(
        &self,
        iv: &[u8; IV_LEN_12],
        aad: &[u8],
        buffer: &mut [u8],
        tag: &GcmTag,
    ) -> Result<(), CryptoError> {
        let nonce = Nonce::from_slice(iv);
        let tag = Tag::from_slice(tag);
        match self {
            AeadImpl::Aes128(cipher) => cipher.decrypt_in_place_detached(nonce, aad, buffer, tag),
            AeadImpl::Aes256(cipher) => cipher.decrypt_in_place_detached(nonce, aad, buffer, tag),
        }
        .map_err(|_| CryptoError::AuthenticationFailure { alg: self.algorithm() })
    }
}
