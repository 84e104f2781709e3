// Tag insertion and validation across the whole MAC registry.
//
// Catches:
// * wrong authenticated range or tag placement
// * length fields not updated on growth
// * silent acceptance of tampered or mis-labelled messages
// * mutation on rejected input

#[cfg(test)]
mod tests {
    use aes_gcm::aead::{AeadInPlace, KeyInit};
    use aes_gcm::{Aes256Gcm, Nonce};
    use blake2::Blake2s256;
    use hmac::{Hmac, Mac, SimpleHmac};
    use proptest::prelude::*;
    use sha2::Sha256;

    use rgoose_core::constants::{enc_ids, mac_ids, offsets};
    use rgoose_core::crypto::{CryptoError, MacProvider, IV_LEN_12};
    use rgoose_core::headers::{
        decode_u32, encode_u16, read_key_epoch, HeaderError, KeyEpoch, MacAlgorithm, MacFamily, RGooseFields,
    };
    use rgoose_core::security::{authenticated_range, RGooseMessage, SecurityEngine};
    use rgoose_core::types::{SecurityError, Verification};

    const HMAC_KEY: &[u8] = b"substation-shared-secret";
    const IV: [u8; IV_LEN_12] = [0x75, 0xb6, 0x6d, 0x3d, 0xf7, 0x3d, 0xa9, 0x53, 0x45, 0xc1, 0x1a, 0x32];

    fn message(pdu_len: usize) -> RGooseMessage {
        let pdu: Vec<u8> = (0..pdu_len).map(|i| (i * 7) as u8).collect();
        RGooseMessage::build(&RGooseFields::default(), &pdu).unwrap()
    }

    fn key_for(alg: MacAlgorithm) -> Vec<u8> {
        match alg {
            MacAlgorithm::GmacAes128_64 | MacAlgorithm::GmacAes128_128 => vec![0x11; 16],
            MacAlgorithm::GmacAes256_64 | MacAlgorithm::GmacAes256_128 => vec![0x22; 32],
            _ => HMAC_KEY.to_vec(),
        }
    }

    fn insert(engine: &SecurityEngine, msg: &mut RGooseMessage, alg: MacAlgorithm) -> usize {
        let key = key_for(alg);
        match alg.family() {
            MacFamily::Hmac => engine.insert_hmac(msg, &key, alg.id(), &KeyEpoch::default()).unwrap(),
            MacFamily::Gmac => engine
                .insert_gmac(msg, &key, alg.id(), &IV, &KeyEpoch::default())
                .unwrap(),
        }
    }

    fn validate(engine: &SecurityEngine, bytes: &[u8], alg: MacAlgorithm) -> Verification {
        let key = key_for(alg);
        match alg.family() {
            MacFamily::Hmac => engine.validate_hmac(bytes, &key),
            MacFamily::Gmac => engine.validate_gmac(bytes, &key, &IV),
        }
    }

// ## 1. Concrete layout

    #[test]
    fn hmac_sha256_80_on_118_byte_message() {
        let engine = SecurityEngine::new();
        let mut msg = message(78);
        assert_eq!(msg.len(), 118);
        assert_eq!(decode_u32(msg.as_bytes(), offsets::SPDU_LENGTH), 108);

        let len = engine
            .insert_hmac(&mut msg, HMAC_KEY, mac_ids::HMAC_SHA256_80, &KeyEpoch::default())
            .unwrap();
        let out = msg.as_bytes();

        assert_eq!(len, 128);
        assert_eq!(out.len(), 128);
        assert_eq!(decode_u32(out, offsets::SPDU_LENGTH), 118);
        assert_eq!(out[offsets::MAC_ALG], mac_ids::HMAC_SHA256_80);
        assert_eq!(out[116], 0x85);
        assert_eq!(out[117], 10);

        let mut reference = <Hmac<Sha256> as Mac>::new_from_slice(HMAC_KEY).unwrap();
        reference.update(&out[2..116]);
        let full = reference.finalize().into_bytes();
        assert_eq!(&out[118..128], &full[..10]);

        assert_eq!(engine.validate_hmac(out, HMAC_KEY), Verification::Valid);
    }

    #[test]
    fn authenticated_range_excludes_li_ti_and_signature_pair() {
        assert_eq!(authenticated_range(118), 2..116);
        assert_eq!(authenticated_range(40), 2..38);
    }

    #[test]
    fn blake2s_tag_matches_reference_hmac() {
        let engine = SecurityEngine::new();
        let mut msg = message(20);
        let body = msg.len();
        engine
            .insert_hmac(&mut msg, HMAC_KEY, mac_ids::HMAC_BLAKE2S_80, &KeyEpoch::default())
            .unwrap();
        let out = msg.as_bytes();

        let mut reference = <SimpleHmac<Blake2s256> as Mac>::new_from_slice(HMAC_KEY).unwrap();
        reference.update(&out[2..body - 2]);
        assert_eq!(&out[body..], &reference.finalize().into_bytes()[..10]);
    }

    #[test]
    fn gmac_tag_matches_reference_gcm_over_aad() {
        let engine = SecurityEngine::new();
        let key = [0x22u8; 32];
        let mut msg = message(33);
        let body = msg.len();
        engine
            .insert_gmac(&mut msg, &key, mac_ids::GMAC_AES256_64, &IV, &KeyEpoch::default())
            .unwrap();
        let out = msg.as_bytes();

        let cipher = Aes256Gcm::new_from_slice(&key).unwrap();
        let mut empty: [u8; 0] = [];
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&IV), &out[2..body - 2], &mut empty)
            .unwrap();
        assert_eq!(&out[body..], &tag[..8]);
    }

// ## 2. Round trip and invariants

    #[test]
    fn roundtrip_every_registry_algorithm() {
        let engine = SecurityEngine::new();
        for alg in MacAlgorithm::ALL {
            let mut msg = message(64);
            insert(&engine, &mut msg, alg);
            assert_eq!(validate(&engine, msg.as_bytes(), alg), Verification::Valid, "{:?}", alg);
        }
    }

    #[test]
    fn insert_preserves_untouched_bytes_and_stamps_epoch() {
        let engine = SecurityEngine::new();
        let mut msg = message(40);
        msg = RGooseMessage::from_bytes({
            let mut raw = msg.into_bytes();
            raw[offsets::ENCRYPTION_ALG] = enc_ids::AES_128_GCM;
            raw
        });
        let before = msg.as_bytes().to_vec();
        let epoch = KeyEpoch::new(1_700_000_000, 3600, 42);

        engine
            .insert_hmac(&mut msg, HMAC_KEY, mac_ids::HMAC_SHA256_128, &epoch)
            .unwrap();
        let after = msg.as_bytes();

        assert_eq!(read_key_epoch(after), epoch);
        assert_eq!(after[offsets::ENCRYPTION_ALG], enc_ids::AES_128_GCM);
        assert_eq!(&after[..offsets::SPDU_LENGTH], &before[..offsets::SPDU_LENGTH]);
        assert_eq!(&after[10..16], &before[10..16]);
        assert_eq!(&after[28..before.len() - 1], &before[28..before.len() - 1]);
        assert_eq!(engine.validate_hmac(after, HMAC_KEY), Verification::Valid);
    }

    proptest! {
        #[test]
        fn prop_length_invariant(alg_idx in 0usize..9, pdu_len in 0usize..300) {
            let engine = SecurityEngine::new();
            let alg = MacAlgorithm::ALL[alg_idx];
            let mut msg = message(pdu_len);
            let before = msg.len();

            let after = insert(&engine, &mut msg, alg);
            let out = msg.as_bytes();

            prop_assert_eq!(after, before + alg.tag_len());
            prop_assert_eq!(out.len(), after);
            prop_assert_eq!(decode_u32(out, offsets::SPDU_LENGTH) as usize, after - 10);
            prop_assert_eq!(out[before - 1] as usize, alg.tag_len());
        }

        #[test]
        fn prop_tamper_never_validates(pick in 0usize..82, bit in 0u8..8) {
            let engine = SecurityEngine::new();
            let alg = MacAlgorithm::HmacSha256_128;
            let mut msg = message(30);
            insert(&engine, &mut msg, alg);
            let mut bytes = msg.into_bytes();
            // 86 bytes: authenticated [2, 68), tag [70, 86)
            let pos = if pick < 66 { 2 + pick } else { 70 + (pick - 66) };
            bytes[pos] ^= 1 << bit;

            let verdict = engine.validate_hmac(&bytes, HMAC_KEY);
            prop_assert_ne!(&verdict, &Verification::Valid);
            if !(offsets::SPDU_LENGTH..offsets::SPDU_NUMBER).contains(&pos) && pos != offsets::MAC_ALG {
                prop_assert_eq!(verdict, Verification::Invalid);
            }
        }
    }

    #[test]
    fn wrong_key_or_iv_is_invalid() {
        let engine = SecurityEngine::new();
        let mut msg = message(16);
        insert(&engine, &mut msg, MacAlgorithm::HmacSha256_256);
        assert_eq!(engine.validate_hmac(msg.as_bytes(), b"other key"), Verification::Invalid);

        let mut msg = message(16);
        insert(&engine, &mut msg, MacAlgorithm::GmacAes128_128);
        let mut other_iv = IV;
        other_iv[11] ^= 1;
        assert_eq!(
            engine.validate_gmac(msg.as_bytes(), &[0x11; 16], &other_iv),
            Verification::Invalid
        );
    }

// ## 3. Re-tagging

    #[test]
    fn retag_replaces_previous_tag() {
        let engine = SecurityEngine::new();
        let mut msg = message(50);
        let base = msg.len();

        insert(&engine, &mut msg, MacAlgorithm::HmacSha256_256);
        assert_eq!(msg.len(), base + 32);

        insert(&engine, &mut msg, MacAlgorithm::HmacSha256_80);
        assert_eq!(msg.len(), base + 10);
        assert_eq!(engine.validate_hmac(msg.as_bytes(), HMAC_KEY), Verification::Valid);

        insert(&engine, &mut msg, MacAlgorithm::GmacAes256_128);
        assert_eq!(msg.len(), base + 16);
        assert_eq!(
            validate(&engine, msg.as_bytes(), MacAlgorithm::GmacAes256_128),
            Verification::Valid
        );
    }

// ## 4. Unsecured messages

    #[test]
    fn fresh_message_is_unsecured() {
        let engine = SecurityEngine::new();
        let msg = message(25);
        assert_eq!(engine.validate_hmac(msg.as_bytes(), HMAC_KEY), Verification::Unsecured);
        assert_eq!(engine.validate_gmac(msg.as_bytes(), &[0x22; 32], &IV), Verification::Unsecured);
    }

    #[test]
    fn mac_none_with_nonzero_signature_length_is_invalid() {
        let engine = SecurityEngine::new();
        let mut bytes = message(25).into_bytes();
        let last = bytes.len() - 1;
        bytes[last] = 10;
        assert_eq!(engine.validate_hmac(&bytes, HMAC_KEY), Verification::Invalid);
        assert_eq!(engine.validate_gmac(&bytes, &[0x22; 32], &IV), Verification::Invalid);
    }

    #[test]
    fn stripped_mac_id_with_trailing_tag_is_invalid() {
        let engine = SecurityEngine::new();
        let mut msg = message(25);
        insert(&engine, &mut msg, MacAlgorithm::HmacSha256_128);
        let mut bytes = msg.into_bytes();
        bytes[offsets::MAC_ALG] = mac_ids::MAC_NONE;
        assert_eq!(engine.validate_hmac(&bytes, HMAC_KEY), Verification::Invalid);
    }

    #[test]
    fn understated_apdu_length_is_never_tagged() {
        let engine = SecurityEngine::new();
        let mut bytes = message(10).into_bytes();
        encode_u16(&mut bytes, 6, offsets::APDU_LENGTH);
        assert_eq!(engine.validate_hmac(&bytes, HMAC_KEY), Verification::Invalid);

        let mut msg = RGooseMessage::from_bytes(bytes);
        let before = msg.clone();
        let mismatch = SecurityError::MalformedMessage(HeaderError::PduExtentMismatch {
            apdu_length: 6,
            pdu_end: 42,
            signature_at: 48,
        });
        assert_eq!(
            engine.insert_hmac(&mut msg, HMAC_KEY, mac_ids::HMAC_SHA256_80, &KeyEpoch::default()),
            Err(mismatch.clone())
        );
        assert_eq!(
            engine.insert_gmac(&mut msg, &[0x22; 32], mac_ids::GMAC_AES256_128, &IV, &KeyEpoch::default()),
            Err(mismatch)
        );
        assert_eq!(msg, before);
        assert_eq!(engine.validate_hmac(msg.as_bytes(), HMAC_KEY), Verification::Invalid);
    }

// ## 5. Rejection without mutation

    #[test]
    fn unknown_algorithm_leaves_message_identical() {
        let engine = SecurityEngine::new();
        for raw in [mac_ids::MAC_NONE, 10, 0x7f, 0xff] {
            let mut msg = message(12);
            let before = msg.clone();
            assert_eq!(
                engine.insert_hmac(&mut msg, HMAC_KEY, raw, &KeyEpoch::default()),
                Err(SecurityError::UnknownAlgorithm { raw })
            );
            assert_eq!(
                engine.insert_gmac(&mut msg, &[0; 32], raw, &IV, &KeyEpoch::default()),
                Err(SecurityError::UnknownAlgorithm { raw })
            );
            assert_eq!(msg, before);
        }
    }

    #[test]
    fn wrong_family_is_rejected() {
        let engine = SecurityEngine::new();
        let mut msg = message(12);
        let before = msg.clone();
        assert_eq!(
            engine.insert_hmac(&mut msg, HMAC_KEY, mac_ids::GMAC_AES256_64, &KeyEpoch::default()),
            Err(SecurityError::WrongMacFamily {
                alg: MacAlgorithm::GmacAes256_64,
                expected: MacFamily::Hmac,
            })
        );
        assert_eq!(
            engine.insert_gmac(&mut msg, &[0; 16], mac_ids::HMAC_SHA256_80, &IV, &KeyEpoch::default()),
            Err(SecurityError::WrongMacFamily {
                alg: MacAlgorithm::HmacSha256_80,
                expected: MacFamily::Gmac,
            })
        );
        assert_eq!(msg, before);

        insert(&engine, &mut msg, MacAlgorithm::GmacAes256_64);
        assert!(matches!(
            engine.validate_hmac(msg.as_bytes(), HMAC_KEY),
            Verification::Error(SecurityError::WrongMacFamily { .. })
        ));
    }

    #[test]
    fn gmac_key_length_is_checked() {
        let engine = SecurityEngine::new();
        let mut msg = message(12);
        let before = msg.clone();
        let err = engine
            .insert_gmac(&mut msg, &[0; 20], mac_ids::GMAC_AES256_128, &IV, &KeyEpoch::default())
            .unwrap_err();
        assert_eq!(
            err,
            SecurityError::Crypto(CryptoError::InvalidKeyLen { expected: 32, actual: 20 })
        );
        assert_eq!(msg, before);
    }

    #[test]
    fn inconsistent_spdu_length_is_malformed() {
        let engine = SecurityEngine::new();
        let mut raw = message(12).into_bytes();
        raw.extend_from_slice(&[0, 0, 0]);
        let mut msg = RGooseMessage::from_bytes(raw.clone());

        assert!(matches!(
            engine.insert_hmac(&mut msg, HMAC_KEY, mac_ids::HMAC_SHA256_80, &KeyEpoch::default()),
            Err(SecurityError::MalformedMessage(HeaderError::LengthMismatch { .. }))
        ));
        assert_eq!(msg.as_bytes(), raw.as_slice());
    }

    #[test]
    fn truncated_tagged_message_is_malformed() {
        let engine = SecurityEngine::new();
        let mut msg = message(12);
        insert(&engine, &mut msg, MacAlgorithm::HmacSha256_128);
        let bytes = msg.as_bytes();
        assert!(matches!(
            engine.validate_hmac(&bytes[..bytes.len() - 4], HMAC_KEY),
            Verification::Error(SecurityError::MalformedMessage(HeaderError::LengthMismatch { .. }))
        ));
        assert!(matches!(
            engine.validate_hmac(&bytes[..30], HMAC_KEY),
            Verification::Error(SecurityError::MalformedMessage(HeaderError::BufferTooShort { .. }))
        ));
    }

    #[test]
    fn signature_length_disagreement() {
        let engine = SecurityEngine::new();
        let mut msg = message(12);
        let body = msg.len();
        insert(&engine, &mut msg, MacAlgorithm::HmacSha256_128);
        let mut bytes = msg.into_bytes();
        bytes[body - 1] = 3;

        assert_eq!(engine.validate_hmac(&bytes, HMAC_KEY), Verification::Invalid);

        let mut msg = RGooseMessage::from_bytes(bytes.clone());
        assert!(matches!(
            engine.insert_hmac(&mut msg, HMAC_KEY, mac_ids::HMAC_SHA256_80, &KeyEpoch::default()),
            Err(SecurityError::MalformedMessage(HeaderError::SignatureLengthMismatch {
                expected: 16,
                found: 3
            }))
        ));
        assert_eq!(msg.as_bytes(), bytes.as_slice());
    }

    #[test]
    fn unknown_id_on_the_wire_is_reported() {
        let engine = SecurityEngine::new();
        let mut bytes = message(12).into_bytes();
        bytes[offsets::MAC_ALG] = 0x42;
        assert_eq!(
            engine.validate_hmac(&bytes, HMAC_KEY),
            Verification::Error(SecurityError::UnknownAlgorithm { raw: 0x42 })
        );
    }

// ## 6. Provider seam

    struct ShortTagProvider;

    impl MacProvider for ShortTagProvider {
        fn compute_mac(
            &self,
            _alg: MacAlgorithm,
            _key: &[u8],
            _iv: Option<&[u8; IV_LEN_12]>,
            _data: &[u8],
        ) -> Result<Vec<u8>, CryptoError> {
            Ok(vec![0xAA; 3])
        }
    }

    #[test]
    fn provider_returning_wrong_tag_size_is_rejected() {
        let engine = SecurityEngine::with_provider(ShortTagProvider);
        let mut msg = message(12);
        let before = msg.clone();
        assert_eq!(
            engine.insert_hmac(&mut msg, HMAC_KEY, mac_ids::HMAC_SHA256_80, &KeyEpoch::default()),
            Err(SecurityError::Crypto(CryptoError::TagLength {
                alg: MacAlgorithm::HmacSha256_80,
                expected: 10,
                actual: 3,
            }))
        );
        assert_eq!(msg, before);
    }
}
