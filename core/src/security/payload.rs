//! security/payload.rs
//! In-place GOOSE PDU encryption and decryption.
//!
//! Design notes:
//! - Only the `ApduLength - 2` PDU bytes change; message length is fixed.
//! - The PDU is transformed on a scratch copy and written back only after the
//!   AEAD call succeeds, so a failed call leaves the message as it was.
//! - The caller keeps the detached GCM tag from `encrypt_payload` and hands
//!   it back to `decrypt_payload`.

use log::{debug, warn};

use crate::constants::{enc_ids, offsets};
use crate::crypto::{AeadProvider, GcmTag, IV_LEN_12};
use crate::headers::{write_key_epoch, EncryptionAlgorithm, KeyEpoch};
use crate::security::engine::SecurityEngine;
use crate::security::message::{checked_layout, RGooseMessage};
use crate::types::{DecryptOutcome, EncryptOutcome, SecurityError};

impl<P: AeadProvider> SecurityEngine<P> {
    /// Encrypt the GOOSE PDU with `alg` (an EncryptionAlgorithmId).
    ///
    /// `alg == 0` clears EncryptionAlgorithmId and leaves the payload alone.
    pub fn encrypt_payload(
        &self,
        message: &mut RGooseMessage,
        key: &[u8],
        alg: u8,
        iv: &[u8; IV_LEN_12],
        epoch: &KeyEpoch,
    ) -> Result<EncryptOutcome, SecurityError> {
        let alg = match alg {
            enc_ids::NONE => None,
            raw => Some(EncryptionAlgorithm::verify(raw)?),
        };
        let (_, pdu) = checked_layout(message.as_bytes())?;
        let Some(alg) = alg else {
            message.as_mut_bytes()[offsets::ENCRYPTION_ALG] = enc_ids::NONE;
            return Ok(EncryptOutcome::NoOp);
        };

        let current = message.as_bytes()[offsets::ENCRYPTION_ALG];
        if current != enc_ids::NONE {
            return Err(SecurityError::AlreadyEncrypted { alg: current });
        }

        let mut scratch = message.as_bytes()[pdu.clone()].to_vec();
        let tag = self.provider().encrypt_in_place(alg, key, iv, &mut scratch)?;

        let buf = message.as_mut_bytes();
        write_key_epoch(buf, epoch);
        buf[offsets::ENCRYPTION_ALG] = alg.id();
        buf[pdu.clone()].copy_from_slice(&scratch);

        debug!("encrypted {} PDU bytes with {:?}", pdu.len(), alg);
        Ok(EncryptOutcome::Encrypted { alg, tag })
    }

    /// Decrypt the GOOSE PDU using the algorithm named in the header.
    ///
    /// On success EncryptionAlgorithmId is reset to none.
    pub fn decrypt_payload(
        &self,
        message: &mut RGooseMessage,
        key: &[u8],
        iv: &[u8; IV_LEN_12],
        tag: &GcmTag,
    ) -> Result<DecryptOutcome, SecurityError> {
        let (_, pdu) = checked_layout(message.as_bytes())?;
        let raw = message.as_bytes()[offsets::ENCRYPTION_ALG];
        if raw == enc_ids::NONE {
            return Ok(DecryptOutcome::NoOp);
        }
        let alg = EncryptionAlgorithm::verify(raw)?;

        let mut scratch = message.as_bytes()[pdu.clone()].to_vec();
        if let Err(e) = self.provider().decrypt_in_place(alg, key, iv, &mut scratch, tag) {
            warn!("{:?} payload rejected on {}-byte message: {}", alg, message.len(), e);
            return Err(e.into());
        }

        let buf = message.as_mut_bytes();
        buf[offsets::ENCRYPTION_ALG] = enc_ids::NONE;
        buf[pdu.clone()].copy_from_slice(&scratch);

        debug!("decrypted {} PDU bytes with {:?}", pdu.len(), alg);
        Ok(DecryptOutcome::Decrypted { alg })
    }
}
