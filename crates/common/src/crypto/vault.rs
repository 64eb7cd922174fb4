//! Passphrase protection of a private signing key
//!
//! The key-encryption key is derived with PBKDF2-HMAC-SHA256 from the passphrase
//! and a fresh 16-byte salt, then the 32-byte private key is sealed with
//! AES-256-GCM under a fresh 12-byte IV. A wrong passphrase and a corrupted record
//! both fail the GCM tag and return the same [`CryptoError::Authentication`].

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::keys::SecretKey;
use super::secret::{generate_iv, Iv, Secret, SECRET_SIZE};
use super::{random_bytes, CryptoError};

/// Size of the PBKDF2 salt in bytes
pub const SALT_SIZE: usize = 16;
/// PBKDF2 rounds used when no count is configured
pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;
/// Lowest round count a [`KeyVault`] will protect with
pub const MIN_KDF_ITERATIONS: u32 = 100_000;
/// Highest round count accepted, so a corrupted record cannot stall an unlock
pub const MAX_KDF_ITERATIONS: u32 = 10_000_000;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("kdf iteration count {requested} is below the minimum of {minimum}")]
    WeakKdf { requested: u32, minimum: u32 },
    #[error("kdf iteration count {requested} is above the maximum of {maximum}")]
    ExcessiveKdf { requested: u32, maximum: u32 },
}

fn default_iterations() -> u32 {
    DEFAULT_KDF_ITERATIONS
}

fn is_default_iterations(iterations: &u32) -> bool {
    *iterations == DEFAULT_KDF_ITERATIONS
}

/// A private signing key sealed under a passphrase
///
/// Stored alongside the public identity fields. The round count is only written
/// when it differs from the default, so default records carry exactly
/// `{encrypted_private_key, salt, iv}`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedKeyRecord {
    #[serde_as(as = "Base64")]
    pub encrypted_private_key: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub salt: [u8; SALT_SIZE],
    #[serde_as(as = "Base64")]
    pub iv: Iv,
    #[serde(
        default = "default_iterations",
        skip_serializing_if = "is_default_iterations"
    )]
    pub iterations: u32,
}

/// Derives key-encryption keys and seals private keys with them
#[derive(Debug, Clone, Copy)]
pub struct KeyVault {
    iterations: u32,
}

impl Default for KeyVault {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

impl KeyVault {
    /// Build a vault with a custom PBKDF2 round count.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::WeakKdf`] below [`MIN_KDF_ITERATIONS`] and
    /// [`VaultError::ExcessiveKdf`] above [`MAX_KDF_ITERATIONS`].
    pub fn new(iterations: u32) -> Result<Self, VaultError> {
        if iterations < MIN_KDF_ITERATIONS {
            return Err(VaultError::WeakKdf {
                requested: iterations,
                minimum: MIN_KDF_ITERATIONS,
            });
        }
        if iterations > MAX_KDF_ITERATIONS {
            return Err(VaultError::ExcessiveKdf {
                requested: iterations,
                maximum: MAX_KDF_ITERATIONS,
            });
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Seal `private_key` under `passphrase` with a fresh salt and IV.
    pub fn protect(
        &self,
        private_key: &SecretKey,
        passphrase: &str,
    ) -> Result<ProtectedKeyRecord, CryptoError> {
        let salt = random_bytes::<SALT_SIZE>()?;
        let iv = generate_iv()?;

        let kek = derive_kek(passphrase, &salt, self.iterations);
        let encrypted_private_key = kek.encrypt(&iv, &*private_key.to_bytes())?;

        tracing::debug!(iterations = self.iterations, "protected private key");
        Ok(ProtectedKeyRecord {
            encrypted_private_key,
            salt,
            iv,
            iterations: self.iterations,
        })
    }

    /// Recover the private key from `record` with `passphrase`.
    ///
    /// The round count stored in the record is used, whatever this vault was
    /// configured with. A count outside
    /// [`MIN_KDF_ITERATIONS`]..=[`MAX_KDF_ITERATIONS`] is treated as corruption.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Authentication`] for a wrong passphrase or a corrupted
    /// record. The two cases are indistinguishable.
    pub fn unprotect(
        &self,
        record: &ProtectedKeyRecord,
        passphrase: &str,
    ) -> Result<SecretKey, CryptoError> {
        if !(MIN_KDF_ITERATIONS..=MAX_KDF_ITERATIONS).contains(&record.iterations) {
            tracing::warn!(
                iterations = record.iterations,
                "key record has an out of range kdf count"
            );
            return Err(CryptoError::Authentication);
        }
        let kek = derive_kek(passphrase, &record.salt, record.iterations);
        let plaintext = Zeroizing::new(kek.decrypt(&record.iv, &record.encrypted_private_key)?);

        SecretKey::try_from_slice(&plaintext).map_err(|_| CryptoError::Authentication)
    }
}

fn derive_kek(passphrase: &str, salt: &[u8; SALT_SIZE], iterations: u32) -> Secret {
    let mut kek = Zeroizing::new([0u8; SECRET_SIZE]);
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, kek.as_mut());
    Secret::from(*kek)
}

/// [`KeyVault::protect`] with the default round count.
pub fn protect(private_key: &SecretKey, passphrase: &str) -> Result<ProtectedKeyRecord, CryptoError> {
    KeyVault::default().protect(private_key, passphrase)
}

/// [`KeyVault::unprotect`] with the default vault.
pub fn unprotect(record: &ProtectedKeyRecord, passphrase: &str) -> Result<SecretKey, CryptoError> {
    KeyVault::default().unprotect(record, passphrase)
}
