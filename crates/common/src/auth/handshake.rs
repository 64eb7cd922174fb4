use crate::identity::Credential;

use super::{ChallengeRequest, ChallengeResponse, HandshakeError, VerifyRequest, VerifyResponse};

/// Where a client is in the login exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    ChallengeRequested,
    Verified,
    Rejected,
}

impl HandshakeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandshakeState::Verified | HandshakeState::Rejected)
    }
}

/// Client side of the login handshake
///
/// Transport is left to the caller: this type only produces the requests and
/// consumes the responses, moving through
/// `Idle -> ChallengeRequested -> Verified | Rejected`. Each challenge is signed
/// at most once.
#[derive(Debug)]
pub struct Handshake {
    user_id: String,
    state: HandshakeState,
    challenge: Option<String>,
    access_token: Option<String>,
}

impl Handshake {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: HandshakeState::Idle,
            challenge: None,
            access_token: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Token from a successful verification.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn challenge_request(&self) -> Result<ChallengeRequest, HandshakeError> {
        self.expect_state(HandshakeState::Idle, "request a challenge")?;
        Ok(ChallengeRequest {
            user_id: self.user_id.clone(),
        })
    }

    pub fn receive_challenge(&mut self, response: ChallengeResponse) -> Result<(), HandshakeError> {
        self.expect_state(HandshakeState::Idle, "receive a challenge")?;
        self.challenge = Some(response.challenge);
        self.state = HandshakeState::ChallengeRequested;
        Ok(())
    }

    /// Sign the received challenge with `credential`.
    pub fn sign(&mut self, credential: &Credential) -> Result<VerifyRequest, HandshakeError> {
        self.expect_state(HandshakeState::ChallengeRequested, "sign")?;
        if credential.user_id() != self.user_id {
            return Err(HandshakeError::Rejected);
        }
        let challenge = self
            .challenge
            .take()
            .ok_or(HandshakeError::InvalidState(self.state, "sign twice"))?;
        let signature = credential.sign_challenge(&challenge)?;
        Ok(VerifyRequest::new(self.user_id.clone(), &signature))
    }

    pub fn accept(&mut self, response: VerifyResponse) -> Result<(), HandshakeError> {
        self.expect_state(HandshakeState::ChallengeRequested, "accept a session")?;
        self.challenge = None;
        self.access_token = Some(response.access_token);
        self.state = HandshakeState::Verified;
        Ok(())
    }

    /// Record a failed verification. Terminal: a new handshake is needed.
    pub fn reject(&mut self) {
        self.challenge = None;
        self.access_token = None;
        self.state = HandshakeState::Rejected;
    }

    fn expect_state(
        &self,
        expected: HandshakeState,
        action: &'static str,
    ) -> Result<(), HandshakeError> {
        if self.state != expected {
            return Err(HandshakeError::InvalidState(self.state, action));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::{MemoryRegistry, Verifier};
    use crate::crypto::SecretKey;
    use crate::identity::Identity;

    fn setup() -> (Verifier<MemoryRegistry>, Credential) {
        let verifier = Verifier::new(MemoryRegistry::new());
        let key = SecretKey::generate().unwrap();
        verifier
            .register(Identity::new("alice", key.public()).unwrap())
            .unwrap();
        (verifier, Credential::new(key))
    }

    #[test]
    fn test_handshake_states() {
        let (verifier, credential) = setup();
        let mut handshake = Handshake::new(credential.user_id());
        assert_eq!(handshake.state(), HandshakeState::Idle);

        let request = handshake.challenge_request().unwrap();
        let challenge = verifier.request_challenge(&request.user_id).unwrap();
        handshake
            .receive_challenge(ChallengeResponse { challenge })
            .unwrap();
        assert_eq!(handshake.state(), HandshakeState::ChallengeRequested);

        let verify = handshake.sign(&credential).unwrap();
        let session = verifier
            .verify(&verify.user_id, &verify.signature().unwrap())
            .unwrap();
        handshake
            .accept(VerifyResponse {
                access_token: session.access_token.clone(),
            })
            .unwrap();

        assert_eq!(handshake.state(), HandshakeState::Verified);
        assert_eq!(handshake.access_token(), Some(session.access_token.as_str()));
    }

    #[test]
    fn test_out_of_order_calls() {
        let (_, credential) = setup();
        let mut handshake = Handshake::new(credential.user_id());

        assert!(matches!(
            handshake.sign(&credential),
            Err(HandshakeError::InvalidState(HandshakeState::Idle, _))
        ));

        handshake
            .receive_challenge(ChallengeResponse {
                challenge: "c".into(),
            })
            .unwrap();
        assert!(handshake.challenge_request().is_err());

        handshake.sign(&credential).unwrap();
        assert!(handshake.sign(&credential).is_err());

        handshake.reject();
        assert!(handshake.state().is_terminal());
        assert!(handshake
            .accept(VerifyResponse {
                access_token: "t".into()
            })
            .is_err());
    }

    #[test]
    fn test_destroyed_credential_cannot_sign() {
        let (_, mut credential) = setup();
        let mut handshake = Handshake::new(credential.user_id());
        handshake
            .receive_challenge(ChallengeResponse {
                challenge: "c".into(),
            })
            .unwrap();

        credential.destroy();
        assert!(matches!(
            handshake.sign(&credential),
            Err(HandshakeError::Identity(_))
        ));
    }
}
