//! crypto/provider.rs
//! Default provider backed by the RustCrypto crates.

use crate::crypto::aead::{AeadImpl, AeadProvider};
use crate::crypto::mac::{compute_tag, MacProvider};
use crate::crypto::types::{CryptoError, GcmTag, IV_LEN_12};
use crate::headers::{EncryptionAlgorithm, MacAlgorithm};

/// Stateless provider: HMAC-SHA256, HMAC-BLAKE2 and AES-GCM from RustCrypto.
/// Payload encryption binds no AAD.
#[derive(Copy, Clone, Debug, Default)]
pub struct RustCryptoProvider;

impl MacProvider for RustCryptoProvider {
    fn compute_mac(
        &self,
        alg: MacAlgorithm,
        key: &[u8],
        iv: Option<&[u8; IV_LEN_12]>,
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        compute_tag(alg, key, iv, data)
    }
}

impl AeadProvider for RustCryptoProvider {
    fn encrypt_in_place(
        &self,
        alg: EncryptionAlgorithm,
        key: &[u8],
        iv: &[u8; IV_LEN_12],
        payload: &mut [u8],
    ) -> Result<GcmTag, CryptoError> {
        AeadImpl::from_alg_and_key(alg, key)?.seal_in_place(iv, &[], payload)
    }

    fn decrypt_in_place(
        &self,
        alg: EncryptionAlgorithm,
        key: &[u8],
        iv: &[u8; IV_LEN_12],
        payload: &mut [u8],
        tag: &GcmTag,
    ) -> Result<(), CryptoError> {
        AeadImpl::from_alg_and_key(alg, key)?.open_in_place(iv, &[], payload, tag)
    }
}
