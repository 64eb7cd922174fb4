//! Integration tests for sealing and opening files

mod common;

use ::common::crypto::sha256_hex;
use ::common::envelope::{ErrorKind, FileEnvelope};

use crate::common::{open, seal, TestUser};

#[test]
fn test_owner_round_trip() {
    common::init_tracing();
    let owner = TestUser::new("owner");
    let data = b"the quick brown fox".to_vec();

    let (envelope, ciphertext) = seal(&owner, "fox.txt", &data);
    let opened = open(&envelope, &ciphertext, &owner, &owner).unwrap();
    assert_eq!(opened, data);
}

#[test]
fn test_empty_file() {
    let owner = TestUser::new("owner");
    let (envelope, ciphertext) = seal(&owner, "empty.txt", b"");
    assert_eq!(envelope.size(), 0);
    assert_eq!(open(&envelope, &ciphertext, &owner, &owner).unwrap(), b"");
}

#[test]
fn test_same_plaintext_seals_differently() {
    let owner = TestUser::new("owner");
    let (a, ct_a) = seal(&owner, "hello.txt", b"helloworld");
    let (b, ct_b) = seal(&owner, "hello.txt", b"helloworld");

    assert_eq!(
        a.content_digest(),
        "936a185caaa266bb9cbe981e9e05cb78cd732b0b3280eb944412bb6f8f8f07af"
    );
    assert_eq!(a.content_digest(), b.content_digest());
    assert_ne!(a.file_id(), b.file_id());
    assert_ne!(ct_a, ct_b);
    assert_ne!(
        a.authorized_users()[0].encrypted_key,
        b.authorized_users()[0].encrypted_key
    );
    assert_eq!(a.file_id(), sha256_hex(&ct_a));
}

#[test]
fn test_bit_flip_is_authentication_failure() {
    let owner = TestUser::new("owner");
    let (envelope, mut ciphertext) = seal(&owner, "data.bin", &[0xAB; 4096]);

    for index in [0, 2048, ciphertext.len() - 1] {
        ciphertext[index] ^= 0x01;
        let err = open(&envelope, &ciphertext, &owner, &owner).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        ciphertext[index] ^= 0x01;
    }
    assert!(open(&envelope, &ciphertext, &owner, &owner).is_ok());
}

#[test]
fn test_swapped_digest_is_integrity_failure() {
    let owner = TestUser::new("owner");
    let (envelope, ciphertext) = seal(&owner, "a.txt", b"first file");
    let (other, _) = seal(&owner, "b.txt", b"second file");

    let mut value = serde_json::to_value(&envelope).unwrap();
    value["sha256"] = other.content_digest().into();
    let tampered = FileEnvelope::from_json(&value.to_string()).unwrap();

    let err = open(&tampered, &ciphertext, &owner, &owner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
}

#[test]
fn test_wrong_owner_key_is_authentication_failure() {
    let owner = TestUser::new("owner");
    let stranger = TestUser::new("stranger");
    let (envelope, ciphertext) = seal(&owner, "a.txt", b"data");

    let err = open(&envelope, &ciphertext, &owner, &stranger).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authentication);
}

#[test]
fn test_json_round_trip_keeps_wire_names() {
    let owner = TestUser::new("owner");
    let (mut envelope, ciphertext) = seal(&owner, "notes.txt", b"notes");
    envelope.set_tags(vec!["work".into()]).unwrap();

    let json = envelope.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    for field in [
        "file_id",
        "filename",
        "owner",
        "size",
        "mimetype",
        "sha256",
        "iv",
        "tags",
        "authorized_users",
    ] {
        assert!(value.get(field).is_some(), "missing field {}", field);
    }

    let decoded = FileEnvelope::from_json(&json).unwrap();
    assert_eq!(decoded, envelope);
    assert_eq!(open(&decoded, &ciphertext, &owner, &owner).unwrap(), b"notes");
}

#[test]
fn test_from_json_rejects_duplicate_users() {
    let owner = TestUser::new("owner");
    let (envelope, _) = seal(&owner, "a.txt", b"data");

    let mut value = serde_json::to_value(&envelope).unwrap();
    let entry = value["authorized_users"][0].clone();
    value["authorized_users"]
        .as_array_mut()
        .unwrap()
        .push(entry);

    let err = FileEnvelope::from_json(&value.to_string()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[test]
fn test_oversized_file_rejected() {
    let owner = TestUser::new("owner");
    let (envelope, _) = seal(&owner, "a.txt", b"data");

    let mut value = serde_json::to_value(&envelope).unwrap();
    value["size"] = (::common::envelope::MAX_FILE_SIZE + 1).into();
    assert!(FileEnvelope::from_json(&value.to_string()).is_err());
}
