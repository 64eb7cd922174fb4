//! Challenge/response login
//!
//! A client proves it holds the signing key behind a registered `user_id`:
//!
//! ```text
//!  client (Handshake)                      server (Verifier)
//!  Idle
//!   | -- ChallengeRequest { user_id } ---> issue challenge, keyed by user_id
//!   | <-- ChallengeResponse { challenge } -
//!  ChallengeRequested
//!   | -- VerifyRequest { user_id, sig } -> take challenge (single use)
//!   |                                      verify sig with stored public key
//!   | <-- VerifyResponse { access_token } - open session
//!  Verified | Rejected
//! ```
//!
//! Challenges are consumed by the first verification attempt, good or bad, so
//! a captured signature can never be replayed. That includes attempts whose
//! signature does not even decode: [`Verifier::verify_request`] takes the
//! challenge before it looks at the signature. Issuing a new challenge for a
//! user replaces the outstanding one.
//!
//! The [`ChallengeStore`] and [`SessionStore`] are the only shared mutable state
//! here; each is guarded by its own mutex and never held across a call out.

mod challenge;
mod handshake;
mod messages;
mod registry;
mod session;
mod verifier;

use std::time::Duration;

pub use challenge::{ChallengeStore, CHALLENGE_NONCE_SIZE};
pub use handshake::{Handshake, HandshakeState};
pub use messages::{
    ChallengeRequest, ChallengeResponse, RegisterRequest, RegisterResponse, SessionResponse,
    VerifyRequest, VerifyResponse,
};
pub use registry::{MemoryRegistry, UserRegistry};
pub use session::{bearer_token, Session, SessionStore, ACCESS_TOKEN_SIZE};
pub use verifier::Verifier;

use crate::crypto::CryptoError;
use crate::identity::IdentityError;

/// How long an issued challenge stays valid
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(300);
/// How long an access token stays valid
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(1800);

#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("unknown user {0}")]
    UnknownUser(String),
    #[error("user {0} already exists")]
    UserExists(String),
    #[error("no outstanding challenge for user {0}")]
    NoChallenge(String),
    #[error("challenge response rejected")]
    Rejected,
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("invalid or expired access token")]
    InvalidToken,
    #[error("handshake is {0:?}, cannot {1}")]
    InvalidState(HandshakeState, &'static str),
    #[error("registry error: {0}")]
    Registry(String),
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}
