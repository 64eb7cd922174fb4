//! # Identity
//!
//! A user is identified by an Ed25519 signing keypair. The public fields
//! ([`Identity`]) are registered with the service and stored in the clear; the
//! private key lives in two places only:
//!
//! - at rest, sealed in a [`ProtectedKeyRecord`]
//! - in memory, held by a [`Credential`] for the length of a session
//!
//! ## User ids
//!
//! `user_id` is the lowercase hex SHA-256 of the public key bytes. It is
//! recomputed and compared whenever an identity crosses a trust boundary, so a
//! record can never pair an id with someone else's key.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    derive_user_id, is_sha256_hex, CryptoError, KeyVault, ProtectedKeyRecord, PublicKey,
    SecretKey, Signature,
};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid alias '{0}': expected 3-20 of [a-z0-9_-]")]
    InvalidAlias(String),
    #[error("invalid user id '{0}': expected 64 lowercase hex characters")]
    InvalidUserId(String),
    #[error("user id {user_id} does not match public key")]
    UserIdMismatch { user_id: String },
    #[error("credential has been destroyed")]
    Destroyed,
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

fn alias_pattern() -> &'static Regex {
    static ALIAS: OnceLock<Regex> = OnceLock::new();
    ALIAS.get_or_init(|| Regex::new(r"^[a-z0-9_-]{3,20}$").expect("static regex"))
}

/// Generate a fresh signing keypair.
///
/// # Errors
///
/// Returns [`CryptoError::Entropy`] if the random source is unavailable; no key
/// is produced in that case.
pub fn generate_identity() -> Result<(PublicKey, SecretKey), CryptoError> {
    let private_key = SecretKey::generate()?;
    Ok((private_key.public(), private_key))
}

/// Public fields of a registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub alias: String,
    pub public_key: PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    /// Build an identity, deriving the user id from `public_key`.
    pub fn new(alias: impl Into<String>, public_key: PublicKey) -> Result<Self, IdentityError> {
        let identity = Self {
            user_id: derive_user_id(&public_key),
            alias: alias.into(),
            public_key,
            name: None,
            email: None,
        };
        identity.validate()?;
        Ok(identity)
    }

    /// Check field formats and that `user_id` hashes from `public_key`.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if !alias_pattern().is_match(&self.alias) {
            return Err(IdentityError::InvalidAlias(self.alias.clone()));
        }
        if !is_sha256_hex(&self.user_id) {
            return Err(IdentityError::InvalidUserId(self.user_id.clone()));
        }
        if derive_user_id(&self.public_key) != self.user_id {
            return Err(IdentityError::UserIdMismatch {
                user_id: self.user_id.clone(),
            });
        }
        Ok(())
    }
}

/// The unlocked private key of a live session
///
/// Holds the signing key between login and logout. [`Credential::destroy`] drops
/// the key, which zeroizes its bytes; any later use fails with
/// [`IdentityError::Destroyed`]. Dropping the credential has the same effect.
pub struct Credential {
    user_id: String,
    public_key: PublicKey,
    key: Option<SecretKey>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Credential {
    pub fn new(key: SecretKey) -> Self {
        let public_key = key.public();
        Self {
            user_id: derive_user_id(&public_key),
            public_key,
            key: Some(key),
        }
    }

    /// Unlock a protected key record with the user's passphrase.
    pub fn unlock(
        vault: &KeyVault,
        record: &ProtectedKeyRecord,
        passphrase: &str,
    ) -> Result<Self, IdentityError> {
        let key = vault.unprotect(record, passphrase)?;
        tracing::debug!("credential unlocked");
        Ok(Self::new(key))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn is_active(&self) -> bool {
        self.key.is_some()
    }

    /// Borrow the private key for an envelope or signing operation.
    pub fn secret_key(&self) -> Result<&SecretKey, IdentityError> {
        self.key.as_ref().ok_or(IdentityError::Destroyed)
    }

    /// Sign the raw UTF-8 bytes of a handshake challenge.
    pub fn sign_challenge(&self, challenge: &str) -> Result<Signature, IdentityError> {
        Ok(self.secret_key()?.sign(challenge.as_bytes()))
    }

    /// End the session: wipe the private key.
    pub fn destroy(&mut self) {
        if self.key.take().is_some() {
            tracing::debug!(user_id = %self.user_id, "credential destroyed");
        }
    }
}
