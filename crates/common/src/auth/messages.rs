use serde::{Deserialize, Serialize};

use crate::crypto::{b64_decode, b64_encode, PublicKey, Signature, SIGNATURE_SIZE};

use super::HandshakeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub user_id: String,
    pub alias: String,
    pub public_key: PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

/// Signed challenge.
///
/// The signature stays base64 text until [`VerifyRequest::signature`] is called,
/// so a body with a garbled signature still names the user whose challenge it
/// spends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub user_id: String,
    #[serde(default)]
    pub signature: String,
}

impl VerifyRequest {
    pub fn new(user_id: impl Into<String>, signature: &Signature) -> Self {
        Self {
            user_id: user_id.into(),
            signature: b64_encode(&signature.to_bytes()),
        }
    }

    /// Decode a verify body, tolerating a signature of the wrong JSON type.
    ///
    /// Only a body that is not a JSON object with a string `user_id` fails.
    pub fn from_body(body: &[u8]) -> Result<Self, HandshakeError> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| HandshakeError::Malformed(e.to_string()))?;
        let user_id = value
            .get("user_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HandshakeError::Malformed("missing user_id".into()))?;
        let signature = value
            .get("signature")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        Ok(Self {
            user_id: user_id.to_string(),
            signature: signature.to_string(),
        })
    }

    /// Decode the signature. Bad base64 or a wrong length is a rejected response.
    pub fn signature(&self) -> Result<Signature, HandshakeError> {
        let bytes = b64_decode(&self.signature).map_err(|_| HandshakeError::Rejected)?;
        let bytes: [u8; SIGNATURE_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HandshakeError::Rejected)?;
        Ok(Signature::from_bytes(&bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::SecretKey;

    #[test]
    fn test_verify_request_wire_shape() {
        let key = SecretKey::generate().unwrap();
        let signature = key.sign(b"challenge");
        let request = VerifyRequest::new("alice", &signature);

        let value = serde_json::to_value(&request).unwrap();
        assert!(value["signature"].is_string());

        let decoded: VerifyRequest = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.signature().unwrap(), signature);
    }

    #[test]
    fn test_short_signature_rejected() {
        let request = VerifyRequest {
            user_id: "alice".into(),
            signature: b64_encode(&[0u8; 10]),
        };
        assert!(matches!(request.signature(), Err(HandshakeError::Rejected)));

        let request = VerifyRequest {
            user_id: "alice".into(),
            signature: "not base64!".into(),
        };
        assert!(matches!(request.signature(), Err(HandshakeError::Rejected)));
    }

    #[test]
    fn test_from_body_keeps_user_id() {
        let request = VerifyRequest::from_body(br#"{"user_id":"alice","signature":42}"#).unwrap();
        assert_eq!(request.user_id, "alice");
        assert!(matches!(request.signature(), Err(HandshakeError::Rejected)));

        let request = VerifyRequest::from_body(br#"{"user_id":"alice"}"#).unwrap();
        assert_eq!(request.signature, "");

        assert!(matches!(
            VerifyRequest::from_body(br#"{"signature":"AAAA"}"#),
            Err(HandshakeError::Malformed(_))
        ));
        assert!(matches!(
            VerifyRequest::from_body(b"not json"),
            Err(HandshakeError::Malformed(_))
        ));
    }
}
