use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::crypto::{b64_encode, random_bytes};

use super::{HandshakeError, DEFAULT_SESSION_TTL};

/// Random bytes in an access token
pub const ACCESS_TOKEN_SIZE: usize = 24;

/// A verified login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
}

#[derive(Debug)]
struct Entry {
    user_id: String,
    expires_at: Instant,
}

/// Live access tokens and the users they belong to
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Open a session for `user_id` with a fresh token.
    pub fn open(&self, user_id: &str) -> Result<Session, HandshakeError> {
        let access_token = b64_encode(&random_bytes::<ACCESS_TOKEN_SIZE>()?);
        let now = Instant::now();

        let mut sessions = self.sessions.lock();
        sessions.retain(|_, e| e.expires_at > now);
        sessions.insert(
            access_token.clone(),
            Entry {
                user_id: user_id.to_string(),
                expires_at: now + self.ttl,
            },
        );

        tracing::debug!(user_id, "opened session");
        Ok(Session {
            user_id: user_id.to_string(),
            access_token,
        })
    }

    /// Resolve a token to its user id.
    pub fn lookup(&self, access_token: &str) -> Result<String, HandshakeError> {
        let mut sessions = self.sessions.lock();
        match sessions.get(access_token) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(entry.user_id.clone()),
            Some(_) => {
                sessions.remove(access_token);
                Err(HandshakeError::InvalidToken)
            }
            None => Err(HandshakeError::InvalidToken),
        }
    }

    /// Resolve an `Authorization` header value of the form `Bearer <token>`.
    pub fn authenticate(&self, authorization: &str) -> Result<String, HandshakeError> {
        let token = bearer_token(authorization).ok_or(HandshakeError::InvalidToken)?;
        self.lookup(token)
    }

    /// End a session. Returns whether the token was live.
    pub fn revoke(&self, access_token: &str) -> bool {
        self.sessions.lock().remove(access_token).is_some()
    }
}

/// Token part of a `Bearer <token>` header value.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
