use std::time::Duration;

use crate::crypto::Signature;
use crate::identity::Identity;

use super::{
    ChallengeStore, HandshakeError, RegisterRequest, Session, SessionStore, UserRegistry,
    VerifyRequest, DEFAULT_CHALLENGE_TTL, DEFAULT_SESSION_TTL,
};

/// Server side of the login handshake
///
/// Composes a [`UserRegistry`] with the challenge and session stores. Every
/// method takes `&self`, so one verifier can be shared across request handlers.
#[derive(Debug)]
pub struct Verifier<R> {
    registry: R,
    challenges: ChallengeStore,
    sessions: SessionStore,
}

impl<R: UserRegistry> Verifier<R> {
    pub fn new(registry: R) -> Self {
        Self::with_ttls(registry, DEFAULT_CHALLENGE_TTL, DEFAULT_SESSION_TTL)
    }

    pub fn with_ttls(registry: R, challenge_ttl: Duration, session_ttl: Duration) -> Self {
        Self {
            registry,
            challenges: ChallengeStore::new(challenge_ttl),
            sessions: SessionStore::new(session_ttl),
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Register a new identity after checking its id against its key.
    pub fn register(&self, identity: Identity) -> Result<(), HandshakeError> {
        identity.validate()?;
        let user_id = identity.user_id.clone();
        self.registry.register(identity)?;
        tracing::info!(user_id = %user_id, "registered user");
        Ok(())
    }

    pub fn register_request(&self, request: RegisterRequest) -> Result<String, HandshakeError> {
        let identity = Identity {
            user_id: request.user_id,
            alias: request.alias,
            public_key: request.public_key,
            name: request.name,
            email: request.email,
        };
        let user_id = identity.user_id.clone();
        self.register(identity)?;
        Ok(user_id)
    }

    /// Issue a challenge for a registered user.
    pub fn request_challenge(&self, user_id: &str) -> Result<String, HandshakeError> {
        if self.registry.lookup(user_id)?.is_none() {
            return Err(HandshakeError::UnknownUser(user_id.to_string()));
        }
        Ok(self.challenges.issue(user_id)?)
    }

    /// Check a signed challenge and open a session.
    ///
    /// The outstanding challenge is consumed before anything else is checked,
    /// so a failed attempt cannot be retried against it.
    pub fn verify(&self, user_id: &str, signature: &Signature) -> Result<Session, HandshakeError> {
        let challenge = self.take_challenge(user_id)?;
        self.check_signature(user_id, &challenge, signature)
    }

    /// [`Verifier::verify`] for a request off the wire.
    ///
    /// The challenge is spent even when the signature does not decode.
    pub fn verify_request(&self, request: &VerifyRequest) -> Result<Session, HandshakeError> {
        let challenge = self.take_challenge(&request.user_id)?;
        let signature = request.signature().inspect_err(|_| {
            tracing::warn!(user_id = %request.user_id, "undecodable challenge signature");
        })?;
        self.check_signature(&request.user_id, &challenge, &signature)
    }

    fn take_challenge(&self, user_id: &str) -> Result<String, HandshakeError> {
        self.challenges
            .take(user_id)
            .ok_or_else(|| HandshakeError::NoChallenge(user_id.to_string()))
    }

    fn check_signature(
        &self,
        user_id: &str,
        challenge: &str,
        signature: &Signature,
    ) -> Result<Session, HandshakeError> {
        let identity = self
            .registry
            .lookup(user_id)?
            .ok_or_else(|| HandshakeError::UnknownUser(user_id.to_string()))?;

        if identity
            .public_key
            .verify(challenge.as_bytes(), signature)
            .is_err()
        {
            tracing::warn!(user_id, "challenge signature rejected");
            return Err(HandshakeError::Rejected);
        }

        let session = self.sessions.open(user_id)?;
        tracing::info!(user_id, "user verified");
        Ok(session)
    }

    /// Resolve a bearer `Authorization` header to a user id.
    pub fn authenticate(&self, authorization: &str) -> Result<String, HandshakeError> {
        self.sessions.authenticate(authorization)
    }
}
