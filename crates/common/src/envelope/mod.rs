//! File envelopes
//!
//! An envelope is everything needed to hand out access to one encrypted file:
//!
//! - **[`FileEnvelope`]**: metadata binding the ciphertext id, the plaintext digest,
//!   the body IV and the list of authorized users
//! - **[`AuthorizationEntry`]**: one recipient's wrapped copy of the file secret
//! - **[`AuthorizeRequest`]**: the wire message carrying new entries to storage
//!
//! # Lifecycle
//!
//! ```text
//!   create (owner)            authorize (owner -> B)         open (B)
//! plaintext --AES-GCM--> ciphertext        |                      |
//!     |                       |     unwrap owner entry     unwrap B entry
//!  sha256                  sha256     re-wrap for B        decrypt body
//!     v                       v            |               check sha256
//! content_digest           file_id   new AuthorizationEntry       v
//!                                                             plaintext
//! ```
//!
//! Sharing never touches the ciphertext: its cost is one unwrap and one wrap,
//! whatever the file size. Every entry is wrapped by the owner, so every opener
//! names the owner's public key as the counterpart.
//!
//! # Concurrency
//!
//! Envelope operations are pure. The storage layer that persists envelopes must
//! keep at most one `authorize` in flight per file, or two appends can race.

mod entry;
mod file_envelope;
mod validate;

pub use entry::{AuthorizationEntry, AuthorizeRequest};
pub use file_envelope::FileEnvelope;
pub use validate::{
    is_valid_filename, is_valid_mimetype, is_valid_tag, MAX_FILENAME_LEN, MAX_FILE_SIZE,
};

use crate::crypto::CryptoError;

/// Coarse classification of an [`EnvelopeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A tag or key check failed; wrong key and tampered data look the same.
    Authentication,
    /// The caller has no entry in the authorized list.
    NotAuthorized,
    /// Decryption worked but the plaintext digest does not match.
    Integrity,
    /// The random source was unavailable.
    Entropy,
    /// Malformed metadata or arguments.
    Malformed,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("user {0} is not authorized for this file")]
    NotAuthorized(String),
    #[error("user {0} is already authorized for this file")]
    AlreadyAuthorized(String),
    #[error("the owner's authorization cannot be revoked")]
    OwnerRevocation,
    #[error("content digest mismatch: expected {expected}, got {actual}")]
    Integrity { expected: String, actual: String },
    #[error("file id mismatch: expected {expected}, got {actual}")]
    FileIdMismatch { expected: String, actual: String },
    #[error("invalid envelope: {0}")]
    Invalid(String),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnvelopeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnvelopeError::NotAuthorized(_) => ErrorKind::NotAuthorized,
            EnvelopeError::Integrity { .. } | EnvelopeError::FileIdMismatch { .. } => {
                ErrorKind::Integrity
            }
            EnvelopeError::Crypto(CryptoError::Authentication) => ErrorKind::Authentication,
            EnvelopeError::Crypto(CryptoError::Entropy) => ErrorKind::Entropy,
            EnvelopeError::AlreadyAuthorized(_)
            | EnvelopeError::OwnerRevocation
            | EnvelopeError::Invalid(_)
            | EnvelopeError::Crypto(_)
            | EnvelopeError::Json(_) => ErrorKind::Malformed,
        }
    }
}
