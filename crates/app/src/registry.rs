use std::fs;
use std::io;
use std::path::PathBuf;

use common::auth::{HandshakeError, UserRegistry};
use common::crypto::is_sha256_hex;
use common::identity::Identity;

use crate::disk::write_new_atomic;

/// Registered users as one `<user_id>.json` file each
///
/// A registration is a single no-clobber rename, so the first of two racing
/// registrations wins and a reader never sees a half-written identity.
#[derive(Debug, Clone)]
pub struct FsRegistry {
    root: PathBuf,
}

impl FsRegistry {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, user_id: &str) -> Option<PathBuf> {
        is_sha256_hex(user_id).then(|| self.root.join(format!("{}.json", user_id)))
    }
}

fn registry_error(e: impl std::fmt::Display) -> HandshakeError {
    HandshakeError::Registry(e.to_string())
}

impl UserRegistry for FsRegistry {
    fn lookup(&self, user_id: &str) -> Result<Option<Identity>, HandshakeError> {
        let Some(path) = self.path_for(user_id) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path).map_err(registry_error)?;
        let identity: Identity = serde_json::from_slice(&data).map_err(registry_error)?;
        identity.validate()?;
        Ok(Some(identity))
    }

    fn register(&self, identity: Identity) -> Result<(), HandshakeError> {
        let path = self
            .path_for(&identity.user_id)
            .ok_or_else(|| registry_error(format!("bad user id {}", identity.user_id)))?;

        if path.exists() {
            return Err(HandshakeError::UserExists(identity.user_id));
        }
        fs::create_dir_all(&self.root).map_err(registry_error)?;
        let json = serde_json::to_vec_pretty(&identity).map_err(registry_error)?;
        match write_new_atomic(&path, &json) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(HandshakeError::UserExists(identity.user_id))
            }
            Err(e) => Err(registry_error(e)),
        }
    }
}
