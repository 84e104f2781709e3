//! security/engine.rs
//! Tag insertion and validation (HMAC and GMAC families).
//!
//! Insertion protocol, for an untagged size `S` and tag length `L`:
//! 1. grow to `S + L` (fresh allocation, the message is untouched on failure)
//! 2. stamp the key epoch, set MacAlgorithmId, keep EncryptionAlgorithmId
//! 3. SpduLength = `S + L - 10`
//! 4. SignatureLength = `L` at `S - 1`
//! 5. tag over `[2, S - 2)`, written to `[S, S + L)`
//!
//! The engine is stateless. Two calls on the same message cannot overlap
//! because insertion needs `&mut RGooseMessage`.

use log::{debug, warn};
use subtle::ConstantTimeEq;

use crate::constants::{mac_ids, offsets, MIN_MESSAGE_LEN};
use crate::crypto::{CryptoError, MacProvider, RustCryptoProvider, IV_LEN_12};
use crate::headers::{
    check_declared_size, goose_pdu_range, write_key_epoch, write_spdu_length, HeaderError,
    KeyEpoch, MacAlgorithm, MacFamily,
};
use crate::security::message::{authenticated_range, checked_layout, RGooseMessage};
use crate::types::{SecurityError, Verification};

/// Message security engine over a pluggable crypto provider.
#[derive(Clone, Debug, Default)]
pub struct SecurityEngine<P = RustCryptoProvider> {
    provider: P,
}

impl SecurityEngine<RustCryptoProvider> {
    pub fn new() -> Self {
        Self { provider: RustCryptoProvider }
    }
}

impl<P> SecurityEngine<P> {
    pub fn with_provider(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: MacProvider> SecurityEngine<P> {
    /// Append an HMAC tag. Returns the new message length.
    ///
    /// A message that already carries a tag is re-tagged: the old tag is dropped first.
    pub fn insert_hmac(
        &self,
        message: &mut RGooseMessage,
        key: &[u8],
        alg: u8,
        epoch: &KeyEpoch,
    ) -> Result<usize, SecurityError> {
        let alg = mac_for_family(alg, MacFamily::Hmac)?;
        self.insert_tag(message, key, alg, None, epoch)
    }

    /// Append a GMAC tag computed with `iv`. Returns the new message length.
    pub fn insert_gmac(
        &self,
        message: &mut RGooseMessage,
        key: &[u8],
        alg: u8,
        iv: &[u8; IV_LEN_12],
        epoch: &KeyEpoch,
    ) -> Result<usize, SecurityError> {
        let alg = mac_for_family(alg, MacFamily::Gmac)?;
        self.insert_tag(message, key, alg, Some(iv), epoch)
    }

    /// Check an HMAC-tagged message. Never mutates.
    pub fn validate_hmac(&self, message: &[u8], key: &[u8]) -> Verification {
        self.validate_tag(message, key, MacFamily::Hmac, None)
    }

    /// Check a GMAC-tagged message with the IV it was tagged under. Never mutates.
    pub fn validate_gmac(&self, message: &[u8], key: &[u8], iv: &[u8; IV_LEN_12]) -> Verification {
        self.validate_tag(message, key, MacFamily::Gmac, Some(iv))
    }

    fn insert_tag(
        &self,
        message: &mut RGooseMessage,
        key: &[u8],
        alg: MacAlgorithm,
        iv: Option<&[u8; IV_LEN_12]>,
        epoch: &KeyEpoch,
    ) -> Result<usize, SecurityError> {
        let tag_len = alg.tag_len();
        let (body, _) = checked_layout(message.as_bytes())?;
        let new_size = body + tag_len;

        let mut grown: Vec<u8> = Vec::new();
        grown
            .try_reserve_exact(new_size)
            .map_err(|_| SecurityError::AllocationFailure { requested: new_size })?;
        grown.extend_from_slice(&message.as_bytes()[..body]);
        grown.resize(new_size, 0);

        write_key_epoch(&mut grown, epoch);
        grown[offsets::MAC_ALG] = alg.id();
        write_spdu_length(&mut grown, new_size)?;
        grown[body - 1] = tag_len as u8;

        let tag = self.provider.compute_mac(alg, key, iv, &grown[authenticated_range(body)])?;
        if tag.len() != tag_len {
            return Err(CryptoError::TagLength { alg, expected: tag_len, actual: tag.len() }.into());
        }
        grown[body..].copy_from_slice(&tag);

        debug!(
            "inserted {:?} tag: {} -> {} bytes (retag: {})",
            alg,
            message.len(),
            new_size,
            body != message.len()
        );
        message.replace(grown);
        Ok(new_size)
    }

    fn validate_tag(
        &self,
        message: &[u8],
        key: &[u8],
        family: MacFamily,
        iv: Option<&[u8; IV_LEN_12]>,
    ) -> Verification {
        match self.verify_tag(message, key, family, iv) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("cannot validate {}-byte message: {}", message.len(), e);
                Verification::Error(e)
            }
        }
    }

    fn verify_tag(
        &self,
        message: &[u8],
        key: &[u8],
        family: MacFamily,
        iv: Option<&[u8; IV_LEN_12]>,
    ) -> Result<Verification, SecurityError> {
        if message.len() < MIN_MESSAGE_LEN {
            return Err(HeaderError::BufferTooShort { have: message.len(), need: MIN_MESSAGE_LEN }.into());
        }

        let raw = message[offsets::MAC_ALG];
        if raw == mac_ids::MAC_NONE {
            return classify_unsecured(message);
        }

        let alg = mac_for_family(raw, family)?;
        let total = check_declared_size(message)?;

        let tag_len = alg.tag_len();
        if total < MIN_MESSAGE_LEN + tag_len {
            return Err(HeaderError::BufferTooShort { have: total, need: MIN_MESSAGE_LEN + tag_len }.into());
        }
        let body = total - tag_len;

        let found = message[body - 1] as usize;
        if found != tag_len {
            warn!("{:?}: SignatureLength {} does not match registry length {}", alg, found, tag_len);
            return Ok(Verification::Invalid);
        }

        let expected = self.provider.compute_mac(alg, key, iv, &message[authenticated_range(body)])?;

        if expected.as_slice().ct_eq(&message[body..]).unwrap_u8() == 1 {
            debug!("{:?} tag valid ({} bytes)", alg, total);
            Ok(Verification::Valid)
        } else {
            warn!("{:?} tag mismatch on {}-byte message", alg, total);
            Ok(Verification::Invalid)
        }
    }
}

/// Resolve a wire id to a MAC algorithm of the requested family.
fn mac_for_family(raw: u8, family: MacFamily) -> Result<MacAlgorithm, SecurityError> {
    let alg = MacAlgorithm::verify(raw)?;
    if alg.family() != family {
        return Err(SecurityError::WrongMacFamily { alg, expected: family });
    }
    Ok(alg)
}

/// `MAC_NONE` is only `Unsecured` when the GOOSE PDU is followed by exactly the
/// signature marker and a zero SignatureLength. Bytes between the PDU and the
/// end of the message, or a non-zero SignatureLength, are a tamper signal.
fn classify_unsecured(message: &[u8]) -> Result<Verification, SecurityError> {
    let total = check_declared_size(message)?;
    match goose_pdu_range(message, total) {
        Ok(_) if message[total - 1] == 0 => Ok(Verification::Unsecured),
        Ok(_) => {
            warn!("MAC algorithm none but SignatureLength is {}", message[total - 1]);
            Ok(Verification::Invalid)
        }
        Err(HeaderError::PduExtentMismatch { pdu_end, .. }) => {
            warn!("MAC algorithm none but {} bytes follow the GOOSE PDU", total - pdu_end);
            Ok(Verification::Invalid)
        }
        Err(e) => Err(e.into()),
    }
}
