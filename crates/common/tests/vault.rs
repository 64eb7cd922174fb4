//! Integration tests for passphrase-protected identities at rest

mod common;

use ::common::crypto::{CryptoError, KeyVault, ProtectedKeyRecord, VaultError};
use ::common::identity::{Credential, IdentityError};

use crate::common::{user_id_of, TestUser};

#[test]
fn test_record_on_disk_unlocks() {
    let alice = TestUser::new("alice");
    let vault = KeyVault::default();
    let record = vault.protect(&alice.secret_key, "correct horse").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&record).unwrap()).unwrap();

    let loaded: ProtectedKeyRecord =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let credential = Credential::unlock(&vault, &loaded, "correct horse").unwrap();
    assert_eq!(credential.user_id(), alice.id());
    assert_eq!(user_id_of(credential.secret_key().unwrap()), alice.id());
}

#[test]
fn test_wrong_passphrase() {
    let alice = TestUser::new("alice");
    let vault = KeyVault::default();
    let record = vault.protect(&alice.secret_key, "pw1").unwrap();

    assert!(matches!(
        Credential::unlock(&vault, &record, "pw2"),
        Err(IdentityError::Crypto(CryptoError::Authentication))
    ));
}

#[test]
fn test_corrupted_record() {
    let alice = TestUser::new("alice");
    let vault = KeyVault::default();
    let mut record = vault.protect(&alice.secret_key, "pw").unwrap();
    record.salt[0] ^= 1;

    assert!(matches!(
        vault.unprotect(&record, "pw"),
        Err(CryptoError::Authentication)
    ));
}

#[test]
fn test_stronger_vault_opens_with_default() {
    let alice = TestUser::new("alice");
    let strong = KeyVault::new(150_000).unwrap();
    let record = strong.protect(&alice.secret_key, "pw").unwrap();
    assert_eq!(record.iterations, 150_000);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["iterations"], 150_000);

    // the record carries its own round count
    let key = KeyVault::default().unprotect(&record, "pw").unwrap();
    assert_eq!(user_id_of(&key), alice.id());
}

#[test]
fn test_weak_vault_refused() {
    assert!(matches!(
        KeyVault::new(1_000),
        Err(VaultError::WeakKdf { .. })
    ));
}

#[test]
fn test_destroyed_credential() {
    let alice = TestUser::new("alice");
    let mut credential = alice.credential();
    assert!(credential.is_active());

    credential.destroy();
    assert!(!credential.is_active());
    assert!(matches!(
        credential.secret_key(),
        Err(IdentityError::Destroyed)
    ));
    assert!(matches!(
        credential.sign_challenge("c"),
        Err(IdentityError::Destroyed)
    ));
}
