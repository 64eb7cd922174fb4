use std::fs;
use std::path::{Path, PathBuf};

use common::crypto::{is_sha256_hex, PublicKey};
use common::envelope::{AuthorizationEntry, EnvelopeError, FileEnvelope};
use common::identity::{Credential, IdentityError};

use crate::disk::{write_atomic, DirLock};

const ENVELOPE_EXT: &str = "json";
const CIPHERTEXT_EXT: &str = "dat";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no envelope with file id {0}")]
    NotFound(String),
    #[error("opening a shared file needs the owner's public key")]
    MissingOwnerKey,
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Envelopes on local disk
///
/// Each file is kept as `<file_id>.json` (the envelope) next to `<file_id>.dat`
/// (the ciphertext). Both are written by rename, ciphertext first, so a file
/// only becomes visible once its envelope is complete; a `.dat` with no `.json`
/// is an orphan from an interrupted seal and is ignored.
///
/// Read-modify-write of an envelope happens under a lock file in the store
/// root, so grants from separate handles or processes never drop each other.
#[derive(Debug, Clone)]
pub struct EnvelopeStore {
    root: PathBuf,
}

impl EnvelopeStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encrypt the file at `path` for `credential` and store it.
    pub fn seal(
        &self,
        credential: &Credential,
        path: &Path,
        tags: Vec<String>,
    ) -> Result<FileEnvelope, StoreError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::InvalidPath(path.display().to_string()))?;
        let plaintext = fs::read(path)?;
        let mimetype = mime_guess::from_path(path).first_or_octet_stream();

        let (mut envelope, ciphertext) = FileEnvelope::create(
            &plaintext,
            filename,
            plaintext.len() as u64,
            mimetype.essence_str(),
            credential.user_id(),
            credential.secret_key()?,
            credential.public_key(),
        )?;
        envelope.set_tags(tags)?;

        self.put(&envelope, &ciphertext)?;
        Ok(envelope)
    }

    /// Grant `user_id` access to a stored file.
    pub fn share(
        &self,
        credential: &Credential,
        file_id: &str,
        user_id: &str,
        public_key: &PublicKey,
    ) -> Result<AuthorizationEntry, StoreError> {
        let _lock = DirLock::acquire(&self.root)?;

        let mut envelope = self.get(file_id)?;
        let entry = envelope.authorize(
            credential.user_id(),
            credential.secret_key()?,
            credential.public_key(),
            user_id,
            public_key,
        )?;
        envelope.add_authorization(entry.clone())?;
        self.write_envelope(&envelope)?;

        tracing::info!(file_id, user_id, "shared file");
        Ok(entry)
    }

    /// Remove `user_id` from a stored file's authorized list.
    pub fn revoke(&self, file_id: &str, user_id: &str) -> Result<(), StoreError> {
        let _lock = DirLock::acquire(&self.root)?;

        let mut envelope = self.get(file_id)?;
        envelope.revoke(user_id)?;
        self.write_envelope(&envelope)?;
        Ok(())
    }

    /// Decrypt a stored file for `credential`.
    ///
    /// `owner_public` may be left out when the credential is the owner's.
    pub fn open(
        &self,
        credential: &Credential,
        file_id: &str,
        owner_public: Option<&PublicKey>,
    ) -> Result<(FileEnvelope, Vec<u8>), StoreError> {
        let envelope = self.get(file_id)?;
        let owner_public = match owner_public {
            Some(key) => key,
            None if envelope.owner() == credential.user_id() => credential.public_key(),
            None => return Err(StoreError::MissingOwnerKey),
        };

        let ciphertext = self.ciphertext(&envelope)?;
        let plaintext = envelope.open(
            &ciphertext,
            credential.user_id(),
            credential.secret_key()?,
            credential.public_key(),
            owner_public,
        )?;
        Ok((envelope, plaintext))
    }

    pub fn get(&self, file_id: &str) -> Result<FileEnvelope, StoreError> {
        let path = self.path_for(file_id, ENVELOPE_EXT)?;
        if !path.exists() {
            return Err(StoreError::NotFound(file_id.to_string()));
        }
        let json = fs::read_to_string(&path)?;
        Ok(FileEnvelope::from_json(&json)?)
    }

    /// Read the ciphertext of `envelope`, checking it against the file id.
    pub fn ciphertext(&self, envelope: &FileEnvelope) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(envelope.file_id(), CIPHERTEXT_EXT)?;
        if !path.exists() {
            return Err(StoreError::NotFound(envelope.file_id().to_string()));
        }
        let ciphertext = fs::read(&path)?;
        envelope.verify_ciphertext(&ciphertext)?;
        Ok(ciphertext)
    }

    /// Every stored envelope, ordered by filename.
    pub fn list(&self) -> Result<Vec<FileEnvelope>, StoreError> {
        let mut envelopes = Vec::new();
        if !self.root.exists() {
            return Ok(envelopes);
        }
        for dir_entry in fs::read_dir(&self.root)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENVELOPE_EXT) {
                continue;
            }
            let json = fs::read_to_string(&path)?;
            match FileEnvelope::from_json(&json) {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => tracing::warn!(path = %path.display(), "skipping bad envelope: {}", e),
            }
        }
        envelopes.sort_by(|a, b| a.filename().cmp(b.filename()));
        Ok(envelopes)
    }

    fn put(&self, envelope: &FileEnvelope, ciphertext: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        write_atomic(&self.path_for(envelope.file_id(), CIPHERTEXT_EXT)?, ciphertext)?;
        self.write_envelope(envelope)
    }

    fn write_envelope(&self, envelope: &FileEnvelope) -> Result<(), StoreError> {
        let path = self.path_for(envelope.file_id(), ENVELOPE_EXT)?;
        write_atomic(&path, envelope.to_json()?.as_bytes())?;
        Ok(())
    }

    fn path_for(&self, file_id: &str, ext: &str) -> Result<PathBuf, StoreError> {
        // file ids become path components
        if !is_sha256_hex(file_id) {
            return Err(StoreError::NotFound(file_id.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", file_id, ext)))
    }
}
