//! Content hashing and binary/text transcoding.
//!
//! Digests are lowercase hex. Every other binary value that crosses a
//! serialization boundary is standard, padded base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use super::keys::PublicKey;
use super::CryptoError;

/// Size of a SHA-256 digest in bytes
pub const SHA256_SIZE: usize = 32;

pub fn sha256(data: &[u8]) -> [u8; SHA256_SIZE] {
    Sha256::digest(data).into()
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Derive the stable user id for a signing public key.
///
/// The id is the hex SHA-256 of the raw 32 public key bytes.
pub fn derive_user_id(public_key: &PublicKey) -> String {
    sha256_hex(&public_key.to_bytes())
}

/// Whether `value` looks like a lowercase hex SHA-256 digest.
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == SHA256_SIZE * 2
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

pub fn b64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn b64_decode(data: &str) -> Result<Vec<u8>, CryptoError> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| CryptoError::Encoding(format!("invalid base64: {}", e)))
}
