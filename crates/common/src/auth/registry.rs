use std::collections::HashMap;

use parking_lot::Mutex;

use crate::identity::Identity;

use super::HandshakeError;

/// Where a verifier looks up the public key registered for a user id
///
/// Implementations must reject a second registration for the same user id with
/// [`HandshakeError::UserExists`]. Callers validate the identity first.
pub trait UserRegistry: Send + Sync {
    fn lookup(&self, user_id: &str) -> Result<Option<Identity>, HandshakeError>;

    fn register(&self, identity: Identity) -> Result<(), HandshakeError>;
}

/// Process-local registry, mainly for tests and single-node setups
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    users: Mutex<HashMap<String, Identity>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.lock().is_empty()
    }
}

impl UserRegistry for MemoryRegistry {
    fn lookup(&self, user_id: &str) -> Result<Option<Identity>, HandshakeError> {
        Ok(self.users.lock().get(user_id).cloned())
    }

    fn register(&self, identity: Identity) -> Result<(), HandshakeError> {
        let mut users = self.users.lock();
        if users.contains_key(&identity.user_id) {
            return Err(HandshakeError::UserExists(identity.user_id));
        }
        users.insert(identity.user_id.clone(), identity);
        Ok(())
    }
}
