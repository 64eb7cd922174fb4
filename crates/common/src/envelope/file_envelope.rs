use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;

use crate::crypto::{
    derive_user_id, generate_iv, is_sha256_hex, sha256_hex, unwrap_key_from, wrap_key_for,
    CryptoError, Iv, PublicKey, Secret, SecretKey,
};

use super::entry::{AuthorizationEntry, AuthorizeRequest};
use super::validate::{is_valid_filename, is_valid_mimetype, is_valid_tag, MAX_FILE_SIZE};
use super::EnvelopeError;

/// Metadata for one encrypted file and everyone allowed to read it.
///
/// # Invariants
///
/// - `file_id` is the hex SHA-256 of the ciphertext (body + tag)
/// - `sha256` is the hex SHA-256 of the plaintext; every successful open checks it
/// - the owner always holds the first entry of `authorized_users`
/// - no user id appears twice in `authorized_users`
///
/// # Serialization
///
/// JSON with the field names `file_id, filename, owner, size, mimetype, sha256, iv,
/// tags, authorized_users`. Binary fields are base64. Use [`FileEnvelope::from_json`]
/// to decode and validate in one step.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEnvelope {
    file_id: String,
    filename: String,
    owner: String,
    size: u64,
    mimetype: String,
    #[serde(rename = "sha256")]
    content_digest: String,
    #[serde_as(as = "Base64")]
    iv: Iv,
    #[serde(default)]
    tags: Vec<String>,
    authorized_users: Vec<AuthorizationEntry>,
}

impl FileEnvelope {
    /// Encrypt `plaintext` under a fresh file secret and authorize the owner.
    ///
    /// Returns the envelope and the ciphertext to store next to it.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::Invalid`] for bad metadata, a `size` that is not the
    ///   plaintext length, or an `owner_id` that does not hash from `owner_public`
    /// - [`CryptoError::Entropy`] if the secret or IV cannot be generated
    pub fn create(
        plaintext: &[u8],
        filename: &str,
        size: u64,
        mimetype: &str,
        owner_id: &str,
        owner_private: &SecretKey,
        owner_public: &PublicKey,
    ) -> Result<(Self, Vec<u8>), EnvelopeError> {
        if size != plaintext.len() as u64 {
            return Err(EnvelopeError::Invalid(format!(
                "declared size {} does not match plaintext length {}",
                size,
                plaintext.len()
            )));
        }
        check_user_key(owner_id, owner_public)?;

        let secret = Secret::generate()?;
        let iv = generate_iv()?;
        let ciphertext = secret.encrypt(&iv, plaintext)?;

        let wrapped = wrap_key_for(&secret, owner_private, owner_public, owner_public)?;

        let envelope = Self {
            file_id: sha256_hex(&ciphertext),
            filename: filename.to_string(),
            owner: owner_id.to_string(),
            size,
            mimetype: mimetype.to_string(),
            content_digest: sha256_hex(plaintext),
            iv,
            tags: Vec::new(),
            authorized_users: vec![AuthorizationEntry::new(owner_id, wrapped)],
        };
        envelope.validate()?;

        tracing::debug!(
            file_id = %envelope.file_id,
            owner = %envelope.owner,
            size,
            "created file envelope"
        );
        Ok((envelope, ciphertext))
    }

    /// Wrap the file secret for a new user.
    ///
    /// Unwraps the owner's own entry and re-wraps the secret for
    /// `new_user_public`. The ciphertext is never touched. The returned entry
    /// still has to be appended with [`FileEnvelope::add_authorization`] (or
    /// sent in an [`AuthorizeRequest`]).
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::NotAuthorized`] if `owner_id` is not this file's owner or
    ///   the owner has no entry
    /// - [`EnvelopeError::AlreadyAuthorized`] if the new user already has an entry
    /// - [`CryptoError::Authentication`] if the owner's entry does not unwrap
    pub fn authorize(
        &self,
        owner_id: &str,
        owner_private: &SecretKey,
        owner_public: &PublicKey,
        new_user_id: &str,
        new_user_public: &PublicKey,
    ) -> Result<AuthorizationEntry, EnvelopeError> {
        if owner_id != self.owner {
            return Err(EnvelopeError::NotAuthorized(owner_id.to_string()));
        }
        check_user_key(owner_id, owner_public)?;
        check_user_key(new_user_id, new_user_public)?;
        if self.is_authorized(new_user_id) {
            return Err(EnvelopeError::AlreadyAuthorized(new_user_id.to_string()));
        }

        let owner_entry = self
            .entry(owner_id)
            .ok_or_else(|| EnvelopeError::NotAuthorized(owner_id.to_string()))?;

        let secret = unwrap_key_from(
            &owner_entry.encrypted_key,
            &owner_entry.iv,
            owner_private,
            owner_public,
            owner_public,
        )?;
        let wrapped = wrap_key_for(&secret, owner_private, owner_public, new_user_public)?;

        tracing::debug!(
            file_id = %self.file_id,
            user_id = %new_user_id,
            "authorized user for file"
        );
        Ok(AuthorizationEntry::new(new_user_id, wrapped))
    }

    /// Decrypt the file for `requester_id`.
    ///
    /// `owner_public` must be the owner's key: every entry was wrapped by the
    /// owner. It is checked against the envelope's `owner` id before any key
    /// agreement, so a caller cannot substitute another party's key.
    ///
    /// # Errors
    ///
    /// - [`EnvelopeError::NotAuthorized`] if the requester has no entry
    /// - [`CryptoError::Authentication`] if `owner_public` is not the owner's key, the
    ///   entry does not unwrap, or the ciphertext fails its tag
    /// - [`EnvelopeError::Integrity`] if decryption succeeds but the plaintext digest
    ///   differs from `sha256`
    pub fn open(
        &self,
        ciphertext: &[u8],
        requester_id: &str,
        requester_private: &SecretKey,
        requester_public: &PublicKey,
        owner_public: &PublicKey,
    ) -> Result<Vec<u8>, EnvelopeError> {
        if derive_user_id(owner_public) != self.owner {
            tracing::warn!(file_id = %self.file_id, "owner public key does not match envelope owner");
            return Err(CryptoError::Authentication.into());
        }
        check_user_key(requester_id, requester_public)?;

        let entry = self
            .entry(requester_id)
            .ok_or_else(|| EnvelopeError::NotAuthorized(requester_id.to_string()))?;

        let secret = unwrap_key_from(
            &entry.encrypted_key,
            &entry.iv,
            requester_private,
            requester_public,
            owner_public,
        )?;
        let plaintext = secret.decrypt(&self.iv, ciphertext)?;

        let actual = sha256_hex(&plaintext);
        if actual != self.content_digest {
            tracing::warn!(file_id = %self.file_id, "plaintext digest mismatch");
            return Err(EnvelopeError::Integrity {
                expected: self.content_digest.clone(),
                actual,
            });
        }

        tracing::debug!(file_id = %self.file_id, user_id = %requester_id, "opened file");
        Ok(plaintext)
    }

    /// Append an entry produced by [`FileEnvelope::authorize`].
    pub fn add_authorization(&mut self, entry: AuthorizationEntry) -> Result<(), EnvelopeError> {
        entry.validate()?;
        if self.is_authorized(&entry.user_id) {
            return Err(EnvelopeError::AlreadyAuthorized(entry.user_id));
        }
        self.authorized_users.push(entry);
        Ok(())
    }

    /// Remove a user's entry. The owner cannot be removed.
    ///
    /// This only drops the wrapped key from the metadata; a user who already
    /// unwrapped the file secret keeps it until the file is re-encrypted.
    pub fn revoke(&mut self, user_id: &str) -> Result<AuthorizationEntry, EnvelopeError> {
        if user_id == self.owner {
            return Err(EnvelopeError::OwnerRevocation);
        }
        let position = self
            .authorized_users
            .iter()
            .position(|e| e.user_id == user_id)
            .ok_or_else(|| EnvelopeError::NotAuthorized(user_id.to_string()))?;
        Ok(self.authorized_users.remove(position))
    }

    /// Wrap entries into a request for the storage service.
    pub fn authorize_request(&self, entries: Vec<AuthorizationEntry>) -> AuthorizeRequest {
        AuthorizeRequest {
            filename: self.filename.clone(),
            authorized_users: entries,
        }
    }

    /// Check that `ciphertext` is the body this envelope was created for.
    pub fn verify_ciphertext(&self, ciphertext: &[u8]) -> Result<(), EnvelopeError> {
        let actual = sha256_hex(ciphertext);
        if actual != self.file_id {
            return Err(EnvelopeError::FileIdMismatch {
                expected: self.file_id.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn rename(&mut self, filename: &str) -> Result<(), EnvelopeError> {
        if !is_valid_filename(filename) {
            return Err(EnvelopeError::Invalid(format!("invalid filename '{}'", filename)));
        }
        self.filename = filename.to_string();
        Ok(())
    }

    pub fn set_tags(&mut self, tags: Vec<String>) -> Result<(), EnvelopeError> {
        if let Some(bad) = tags.iter().find(|t| !is_valid_tag(t)) {
            return Err(EnvelopeError::Invalid(format!("invalid tag '{}'", bad)));
        }
        self.tags = tags;
        Ok(())
    }

    /// Check every structural invariant.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if !is_sha256_hex(&self.file_id) {
            return Err(EnvelopeError::Invalid("file_id is not a sha256 hex digest".into()));
        }
        if !is_sha256_hex(&self.content_digest) {
            return Err(EnvelopeError::Invalid("sha256 is not a sha256 hex digest".into()));
        }
        if !is_sha256_hex(&self.owner) {
            return Err(EnvelopeError::Invalid("owner is not a user id".into()));
        }
        if !is_valid_filename(&self.filename) {
            return Err(EnvelopeError::Invalid(format!(
                "invalid filename '{}'",
                self.filename
            )));
        }
        if !is_valid_mimetype(&self.mimetype) {
            return Err(EnvelopeError::Invalid(format!(
                "invalid mimetype '{}'",
                self.mimetype
            )));
        }
        if self.size > MAX_FILE_SIZE {
            return Err(EnvelopeError::Invalid(format!(
                "size {} exceeds maximum of {}",
                self.size, MAX_FILE_SIZE
            )));
        }
        if let Some(bad) = self.tags.iter().find(|t| !is_valid_tag(t)) {
            return Err(EnvelopeError::Invalid(format!("invalid tag '{}'", bad)));
        }

        let request = self.authorize_request(self.authorized_users.clone());
        request.validate()?;
        if self.authorized_user_ids().next() != Some(self.owner.as_str()) {
            return Err(EnvelopeError::Invalid(
                "the owner must hold the first authorization".into(),
            ));
        }
        Ok(())
    }

    /// Decode and validate an envelope from JSON.
    pub fn from_json(json: &str) -> Result<Self, EnvelopeError> {
        let envelope: Self = serde_json::from_str(json)?;
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mimetype(&self) -> &str {
        &self.mimetype
    }

    /// Hex SHA-256 of the plaintext.
    pub fn content_digest(&self) -> &str {
        &self.content_digest
    }

    /// IV of the file body.
    pub fn iv(&self) -> &Iv {
        &self.iv
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn authorized_users(&self) -> &[AuthorizationEntry] {
        &self.authorized_users
    }

    pub fn authorized_user_ids(&self) -> impl Iterator<Item = &str> {
        self.authorized_users.iter().map(|e| e.user_id.as_str())
    }

    pub fn entry(&self, user_id: &str) -> Option<&AuthorizationEntry> {
        self.authorized_users.iter().find(|e| e.user_id == user_id)
    }

    pub fn is_authorized(&self, user_id: &str) -> bool {
        self.entry(user_id).is_some()
    }
}

/// Check that `user_id` is the id derived from `public_key`.
fn check_user_key(user_id: &str, public_key: &PublicKey) -> Result<(), EnvelopeError> {
    if derive_user_id(public_key) != user_id {
        return Err(EnvelopeError::Invalid(format!(
            "user id {} does not match its public key",
            user_id
        )));
    }
    Ok(())
}
