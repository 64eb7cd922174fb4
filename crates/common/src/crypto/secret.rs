//! Symmetric encryption using AES-256-GCM
//!
//! A `Secret` is the per-file symmetric key. It is generated fresh for every file,
//! never stored in the clear, and leaves memory only after being wrapped for a
//! recipient. The same AEAD construction seals file bodies, wrapped keys and the
//! vault's protected private key; the caller always supplies the IV so it can be
//! stored next to the ciphertext.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{random_bytes, CryptoError};

/// Size of an AES-GCM IV in bytes
pub const IV_SIZE: usize = 12;
/// Size of an AES-256 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of the AES-GCM authentication tag appended to every ciphertext
pub const TAG_SIZE: usize = 16;

/// A 96-bit AES-GCM initialization vector
pub type Iv = [u8; IV_SIZE];

/// Generate a fresh random IV.
///
/// # Errors
///
/// Returns [`CryptoError::Entropy`] if the random source cannot be read.
pub fn generate_iv() -> Result<Iv, CryptoError> {
    random_bytes::<IV_SIZE>()
}

/// A 256-bit symmetric key
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate()?;
/// let iv = generate_iv()?;
///
/// let ciphertext = secret.encrypt(&iv, b"sensitive data")?;
/// let recovered = secret.decrypt(&iv, &ciphertext)?;
/// assert_eq!(b"sensitive data", &recovered[..]);
/// ```
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_SIZE]);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&"<redacted>").finish()
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret from the OS random source
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self(random_bytes::<SECRET_SIZE>()?))
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        let buff: [u8; SECRET_SIZE] = data.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            ))
        })?;
        Ok(buff.into())
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.bytes()))
    }

    /// Encrypt `data` under this key and `iv`.
    ///
    /// The output is `ciphertext || tag`, `TAG_SIZE` bytes longer than the input.
    /// An IV must never be reused with the same key.
    pub fn encrypt(&self, iv: &Iv, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.cipher()
            .encrypt(Nonce::from_slice(iv), data)
            .map_err(|_| CryptoError::Encoding("encrypt error".into()))
    }

    /// Decrypt `ciphertext || tag` produced by [`Secret::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Authentication`] if the tag does not verify. No
    /// plaintext is released in that case.
    pub fn decrypt(&self, iv: &Iv, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < TAG_SIZE {
            return Err(CryptoError::Authentication);
        }
        self.cipher()
            .decrypt(Nonce::from_slice(iv), data)
            .map_err(|_| CryptoError::Authentication)
    }
}
