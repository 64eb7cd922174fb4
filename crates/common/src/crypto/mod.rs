//! Cryptographic primitives for locket
//!
//! This module provides the cryptographic foundation for locket's access model:
//!
//! - **Identity & Authentication**: Ed25519 keypairs identify users and sign login challenges
//! - **Encryption**: AES-256-GCM for file bodies and for wrapped keys, one `Secret` per file
//! - **Key Wrapping**: ECDH over the X25519 form of each user's Ed25519 keys
//! - **Key Vault**: PBKDF2-HMAC-SHA256 passphrase protection of the private signing key
//!
//! # Security Model
//!
//! ## User Identity
//! Each user has a single Ed25519 keypair (`SecretKey`/`PublicKey`). The same keypair
//! signs handshake challenges and, after conversion to X25519, takes part in key agreement.
//! The user id is the lowercase hex SHA-256 of the public key bytes.
//!
//! ## Key Wrapping Protocol
//! To give a recipient access to a file secret:
//! 1. Convert the sender's secret key and the recipient's public key to X25519
//! 2. Perform ECDH to derive a shared secret
//! 3. Hash the shared secret with SHA-256 to get the wrapping key
//! 4. Encrypt the file secret with AES-256-GCM under a fresh 12-byte IV
//!
//! The recipient runs the mirror computation with their secret key and the sender's
//! public key. Both sides land on the same shared secret.
//!
//! # Errors
//!
//! Every AEAD tag failure and every bad signature surfaces as
//! [`CryptoError::Authentication`]. The variant never says whether the key was wrong
//! or the data was altered.

mod digest;
mod keys;
mod secret;
mod vault;
mod wrap;

pub use digest::{
    b64_decode, b64_encode, derive_user_id, is_sha256_hex, sha256, sha256_hex, SHA256_SIZE,
};
pub use ed25519_dalek::Signature;
pub use keys::{
    Birational, KeyAgreement, PublicKey, SecretKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE,
    SIGNATURE_SIZE,
};
pub use secret::{generate_iv, Iv, Secret, IV_SIZE, SECRET_SIZE, TAG_SIZE};
pub use vault::{
    protect, unprotect, KeyVault, ProtectedKeyRecord, VaultError, DEFAULT_KDF_ITERATIONS,
    MAX_KDF_ITERATIONS, MIN_KDF_ITERATIONS, SALT_SIZE,
};
pub use wrap::{unwrap_key_from, wrap_key_for, WrappedKey, WRAPPED_KEY_SIZE};

/// Errors shared by every cryptographic operation
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// An AEAD tag or a signature failed to verify.
    #[error("authentication failed")]
    Authentication,
    /// The operating system random source could not be read.
    #[error("random source unavailable")]
    Entropy,
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Fill a fixed-size buffer from the OS random source.
pub(crate) fn random_bytes<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut buff = [0u8; N];
    getrandom::getrandom(&mut buff).map_err(|e| {
        tracing::error!("random source failure: {}", e);
        CryptoError::Entropy
    })?;
    Ok(buff)
}
