use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;

use crate::crypto::{is_sha256_hex, Iv, WrappedKey, WRAPPED_KEY_SIZE};

use super::validate::is_valid_filename;
use super::EnvelopeError;

/// One recipient's wrapped copy of a file secret.
///
/// `encrypted_key` is the AES-GCM sealed secret (key bytes + tag) and `iv` the
/// IV it was sealed under. Both are base64 on the wire.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationEntry {
    pub user_id: String,
    #[serde_as(as = "Base64")]
    pub encrypted_key: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub iv: Iv,
}

impl AuthorizationEntry {
    pub fn new(user_id: impl Into<String>, wrapped: WrappedKey) -> Self {
        Self {
            user_id: user_id.into(),
            encrypted_key: wrapped.encrypted_key,
            iv: wrapped.iv,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), EnvelopeError> {
        if !is_sha256_hex(&self.user_id) {
            return Err(EnvelopeError::Invalid(format!(
                "authorized user id '{}' is not a sha256 hex digest",
                self.user_id
            )));
        }
        if self.encrypted_key.len() != WRAPPED_KEY_SIZE {
            return Err(EnvelopeError::Invalid(format!(
                "wrapped key for {} has {} bytes, expected {}",
                self.user_id,
                self.encrypted_key.len(),
                WRAPPED_KEY_SIZE
            )));
        }
        Ok(())
    }
}

/// Wire message carrying new grants for a file to the storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    pub filename: String,
    pub authorized_users: Vec<AuthorizationEntry>,
}

impl AuthorizeRequest {
    /// Check the filename and every entry, and that no user id repeats.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if !is_valid_filename(&self.filename) {
            return Err(EnvelopeError::Invalid(format!(
                "invalid filename '{}'",
                self.filename
            )));
        }
        if self.authorized_users.is_empty() {
            return Err(EnvelopeError::Invalid("no authorized users".into()));
        }
        for (i, entry) in self.authorized_users.iter().enumerate() {
            entry.validate()?;
            if self.authorized_users[..i]
                .iter()
                .any(|e| e.user_id == entry.user_id)
            {
                return Err(EnvelopeError::AlreadyAuthorized(entry.user_id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{sha256_hex, IV_SIZE};

    fn entry(user: &[u8]) -> AuthorizationEntry {
        AuthorizationEntry {
            user_id: sha256_hex(user),
            encrypted_key: vec![7u8; WRAPPED_KEY_SIZE],
            iv: [1u8; IV_SIZE],
        }
    }

    #[test]
    fn test_entry_wire_shape() {
        let value = serde_json::to_value(entry(b"bob")).unwrap();
        assert_eq!(value["iv"], "AQEBAQEBAQEBAQEB");
        assert!(value["encrypted_key"].is_string());
        assert_eq!(value["user_id"], sha256_hex(b"bob"));
    }

    #[test]
    fn test_bad_iv_length_rejected_on_decode() {
        let json = format!(
            r#"{{"user_id":"{}","encrypted_key":"AAAA","iv":"AAAA"}}"#,
            sha256_hex(b"bob")
        );
        assert!(serde_json::from_str::<AuthorizationEntry>(&json).is_err());
    }

    #[test]
    fn test_authorize_request_rejects_duplicates() {
        let request = AuthorizeRequest {
            filename: "notes.txt".into(),
            authorized_users: vec![entry(b"bob"), entry(b"carol"), entry(b"bob")],
        };
        assert!(matches!(
            request.validate(),
            Err(EnvelopeError::AlreadyAuthorized(_))
        ));
    }

    #[test]
    fn test_authorize_request_rejects_short_key() {
        let mut bad = entry(b"bob");
        bad.encrypted_key.truncate(10);
        let request = AuthorizeRequest {
            filename: "notes.txt".into(),
            authorized_users: vec![bad],
        };
        assert!(matches!(request.validate(), Err(EnvelopeError::Invalid(_))));
    }
}
