use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::crypto::{b64_encode, random_bytes, CryptoError};

use super::DEFAULT_CHALLENGE_TTL;

/// Random bytes at the front of every challenge
pub const CHALLENGE_NONCE_SIZE: usize = 24;

#[derive(Debug)]
struct Pending {
    challenge: String,
    expires_at: Instant,
}

/// Outstanding login challenges, at most one per user
///
/// A challenge is the base64 of 24 random bytes followed by the issue time as
/// an 8-byte big-endian unix timestamp.
#[derive(Debug)]
pub struct ChallengeStore {
    ttl: Duration,
    pending: Mutex<HashMap<String, Pending>>,
}

impl Default for ChallengeStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHALLENGE_TTL)
    }
}

impl ChallengeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh challenge for `user_id`, replacing any outstanding one.
    pub fn issue(&self, user_id: &str) -> Result<String, CryptoError> {
        let nonce = random_bytes::<CHALLENGE_NONCE_SIZE>()?;
        let issued_at = chrono::Utc::now().timestamp();

        let mut raw = Vec::with_capacity(CHALLENGE_NONCE_SIZE + 8);
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&issued_at.to_be_bytes());
        let challenge = b64_encode(&raw);

        let now = Instant::now();
        let mut pending = self.pending.lock();
        pending.retain(|_, p| p.expires_at > now);
        pending.insert(
            user_id.to_string(),
            Pending {
                challenge: challenge.clone(),
                expires_at: now + self.ttl,
            },
        );

        tracing::debug!(user_id, "issued challenge");
        Ok(challenge)
    }

    /// Remove and return the challenge for `user_id`.
    ///
    /// Returns `None` if there is none or it has expired. Either way nothing is
    /// left behind for a second attempt.
    pub fn take(&self, user_id: &str) -> Option<String> {
        let pending = self.pending.lock().remove(user_id)?;
        if pending.expires_at <= Instant::now() {
            tracing::debug!(user_id, "challenge expired");
            return None;
        }
        Some(pending.challenge)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
