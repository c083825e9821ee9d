//! Memo Protocol Test Vectors
//!
//! Fixed inputs with known outputs for the seed codec, key derivation,
//! size accounting, the format grammar and the payload codecs. A change in any of these breaks
//! compatibility with messages already on the ledger.

#[cfg(test)]
mod memo_test_vectors {
    use crate::chunking::max_chunk_data_bytes;
    use crate::config::ProtocolConfig;
    use crate::crypto::{decode_seed, encode_seed, WalletKeys};
    use crate::record::{generate_message_id_at, is_message_id, Memo};
    use crate::size::calculate_memo_size;
    use crate::structure::{format_prefix, CompressionKind, EncryptionKind, MemoStructure};
    use crate::task::{parse_task_message_id, task_message_id, TaskType};
    use crate::crypto::decrypt;
    use crate::group::{parse_group, MemoContent, MemoGroup};
    use crate::legacy;
    use crate::record::MemoTransaction;
    use chrono::{TimeZone, Utc};

    /// Brotli stream (one stored meta-block) of "please review my draft by
    /// Friday", base64-encoded.
    const BROTLI_PAYLOAD: &str = "8AEQcGxlYXNlIHJldmlldyBteSBkcmFmdCBieSBGcmlkYXkD";

    /// Fernet token of the same text under the secret below, as written by
    /// the Python wallet at 2024-01-01T00:00:00Z.
    const FERNET_SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
    const FERNET_TOKEN: &str = "gAAAAABlkgCAAAECAwQFBgcICQoLDA0ODxYbPDjwSH6q5pZ_euj9BymCJIS3WRxkvXELxlQROdOpDjpV32FPNy-MVTqxQj3hNk4MK8MBVwP7Y8ggdhxyXPzE70Lo_uOKMSsWrB44aT5v";

    const MEMO_TYPE: &str = "v1.0.2024-01-01_00:00__AB12";

    /// Vector 1: ed25519 seed to ledger public key
    ///
    /// Seed and key as published by the ledger's key-pair reference library.
    #[test]
    fn test_vector_1_seed_to_public_key() {
        let seed = "sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r";
        let keys = WalletKeys::from_seed(seed).expect("valid seed");
        assert_eq!(
            keys.public_key_hex(),
            "ED01FA53FA5A7E77798F882ECE20B1ABC00BB358A9E55A202D0D0676BD0CE37A63"
        );

        let entropy = decode_seed(seed).unwrap();
        assert_eq!(encode_seed(&entropy), seed, "seed codec must round-trip");
    }

    /// Vector 2: hex entropy is accepted in place of a seed
    #[test]
    fn test_vector_2_hex_entropy() {
        let entropy = decode_seed("000102030405060708090A0B0C0D0E0F").unwrap();
        assert_eq!(entropy, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);

        let from_hex = WalletKeys::from_seed("000102030405060708090a0b0c0d0e0f").unwrap();
        let from_seed = WalletKeys::from_seed(&encode_seed(&entropy)).unwrap();
        assert_eq!(from_hex.public_key_hex(), from_seed.public_key_hex());
    }

    /// Vector 3: public keys are 33 bytes, `ED` prefixed, uppercase
    #[test]
    fn test_vector_3_public_key_format() {
        let keys = WalletKeys::from_entropy(&[0u8; 16]).unwrap();
        let hex_key = keys.public_key_hex();
        assert_eq!(hex_key.len(), 66);
        assert!(hex_key.starts_with("ED"));
        assert_eq!(hex_key, hex_key.to_uppercase());
        assert_eq!(&hex_key[2..], hex::encode_upper(keys.public_key_bytes()));
    }

    /// Vector 4: corrupted seeds are rejected
    #[test]
    fn test_vector_4_bad_seeds() {
        // Last character changed: checksum mismatch
        assert!(decode_seed("sEdSKaCy2JT7JaM7v95H9SxkhP9wS2s").is_err());
        assert!(decode_seed("").is_err());
        assert!(decode_seed("0OIl").is_err(), "characters outside the alphabet");
    }

    /// Vector 5: hex size of a memo triplet
    #[test]
    fn test_vector_5_memo_size() {
        let size = calculate_memo_size("v1.e.b.c1/2", MEMO_TYPE, "hello", 100);
        assert_eq!(size.format_size, 22);
        assert_eq!(size.type_size, 54);
        assert_eq!(size.data_size, 10);
        assert_eq!(size.total_size, 186);

        let encoded = Memo::new("v1.e.b.c1/2", MEMO_TYPE, "hello").encode();
        assert_eq!(encoded.hex_len() + 100, size.total_size);
    }

    /// Vector 6: per-chunk data budget
    ///
    /// `v1.-.-.c999/999` (30 hex) + type (54 hex) + overhead 100 = 184.
    #[test]
    fn test_vector_6_chunk_budget() {
        let prefix = format_prefix("1", EncryptionKind::None, CompressionKind::None);
        assert_eq!(prefix, "v1.-.-");

        let default = max_chunk_data_bytes(&prefix, MEMO_TYPE, &ProtocolConfig::default()).unwrap();
        assert_eq!(default, (1024 - 184) / 2);

        let conservative =
            max_chunk_data_bytes(&prefix, MEMO_TYPE, &ProtocolConfig::conservative()).unwrap();
        assert_eq!(conservative, (760 - 184) / 2);
    }

    /// Vector 7: format tags
    #[test]
    fn test_vector_7_format_tags() {
        let cases = [
            ("v1.-.-.c1/1", EncryptionKind::None, CompressionKind::None, Some((1, 1))),
            ("v1.e.-.c2/3", EncryptionKind::Ecdh, CompressionKind::None, Some((2, 3))),
            ("v1.-.b.c10/12", EncryptionKind::None, CompressionKind::Compressed, Some((10, 12))),
            ("v1.e.b.-", EncryptionKind::Ecdh, CompressionKind::Compressed, None),
        ];
        for (format, encryption, compression, chunk) in cases {
            let structure = MemoStructure::parse(format, "payload");
            assert_eq!(
                structure,
                MemoStructure::Standardized {
                    version: "1".into(),
                    encryption,
                    compression,
                    chunk,
                },
                "format {}",
                format
            );
        }

        assert_eq!(
            MemoStructure::parse("alice", "chunk_3__abc"),
            MemoStructure::Legacy { chunk_index: Some(3) }
        );
        assert_eq!(MemoStructure::parse("alice", "just text"), MemoStructure::Unstructured);
    }

    /// Vector 8: message and task ids
    #[test]
    fn test_vector_8_message_ids() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 9, 0).unwrap();
        let id = generate_message_id_at(at);
        assert!(id.starts_with("v1.0.2024-03-05_07:09__"), "{}", id);
        assert_eq!(id.len(), MEMO_TYPE.len());
        assert!(is_message_id(&id));

        let task_id = task_message_id(MEMO_TYPE, TaskType::Proposal);
        assert_eq!(task_id, "v1.0.2024-01-01_00:00__AB12__PROPOSAL");
        assert_eq!(
            parse_task_message_id(&task_id).unwrap(),
            (MEMO_TYPE.to_string(), TaskType::Proposal)
        );
    }

    /// Vector 9: `b` flag and `COMPRESSED__` marker carry brotli
    #[test]
    fn test_vector_9_brotli_payloads() {
        let record = MemoTransaction {
            hash: "A1".into(),
            account: "rA".into(),
            destination: "rB".into(),
            memo: Memo::new("v1.-.b.c1/1", MEMO_TYPE, BROTLI_PAYLOAD),
            ledger_sequence: 10,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            delivered_amount: 0.0,
        };
        let group = MemoGroup::new(MEMO_TYPE, vec![record]).unwrap();
        assert_eq!(
            parse_group(&group, false, None, &ProtocolConfig::default()).unwrap(),
            MemoContent::Plain("please review my draft by Friday".into())
        );

        let envelope =
            legacy::unwrap(&format!("COMPRESSED__{}", BROTLI_PAYLOAD), 1 << 20).unwrap();
        assert!(!envelope.encrypted);
        assert_eq!(envelope.payload, "please review my draft by Friday");
    }

    /// Vector 10: `e` flag and `WHISPER__` marker carry Fernet tokens
    #[test]
    fn test_vector_10_fernet_token() {
        assert_eq!(
            decrypt(FERNET_TOKEN, FERNET_SECRET).unwrap(),
            "please review my draft by Friday"
        );

        let envelope = legacy::unwrap(&format!("WHISPER__{}", FERNET_TOKEN), 1 << 20).unwrap();
        assert!(envelope.encrypted);
        assert_eq!(
            decrypt(&envelope.payload, FERNET_SECRET).unwrap(),
            "please review my draft by Friday"
        );
    }
}
