//! Shared test utilities for envelope and handshake integration tests
#![allow(dead_code)]

use common::crypto::{derive_user_id, PublicKey, SecretKey};
use common::envelope::FileEnvelope;
use common::identity::{Credential, Identity};

/// A registered user with their keys in hand
pub struct TestUser {
    pub identity: Identity,
    pub secret_key: SecretKey,
}

impl TestUser {
    pub fn new(alias: &str) -> Self {
        let secret_key = SecretKey::generate().unwrap();
        let identity = Identity::new(alias, secret_key.public()).unwrap();
        Self {
            identity,
            secret_key,
        }
    }

    pub fn id(&self) -> &str {
        &self.identity.user_id
    }

    pub fn public(&self) -> PublicKey {
        self.identity.public_key
    }

    pub fn credential(&self) -> Credential {
        Credential::new(self.secret_key.clone())
    }
}

/// Seal `data` as `name` for `owner`.
pub fn seal(owner: &TestUser, name: &str, data: &[u8]) -> (FileEnvelope, Vec<u8>) {
    FileEnvelope::create(
        data,
        name,
        data.len() as u64,
        "text/plain",
        owner.id(),
        &owner.secret_key,
        &owner.public(),
    )
    .unwrap()
}

/// Authorize `user` on `envelope` and append the entry.
pub fn share(envelope: &mut FileEnvelope, owner: &TestUser, user: &TestUser) {
    let entry = envelope
        .authorize(
            owner.id(),
            &owner.secret_key,
            &owner.public(),
            user.id(),
            &user.public(),
        )
        .unwrap();
    envelope.add_authorization(entry).unwrap();
}

/// Open `envelope` as `user`.
pub fn open(
    envelope: &FileEnvelope,
    ciphertext: &[u8],
    user: &TestUser,
    owner: &TestUser,
) -> Result<Vec<u8>, common::envelope::EnvelopeError> {
    envelope.open(
        ciphertext,
        user.id(),
        &user.secret_key,
        &user.public(),
        &owner.public(),
    )
}

pub fn user_id_of(key: &SecretKey) -> String {
    derive_user_id(&key.public())
}

/// Install a test subscriber so library logs show up with `--nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
