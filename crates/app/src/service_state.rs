use std::sync::Arc;

use common::auth::Verifier;

use crate::registry::FsRegistry;
use crate::ServiceConfig;

/// Shared state handed to every request handler
#[derive(Debug, Clone)]
pub struct State {
    verifier: Arc<Verifier<FsRegistry>>,
}

impl State {
    pub fn new(verifier: Verifier<FsRegistry>) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let registry = FsRegistry::new(config.users_path.clone());
        Self::new(Verifier::with_ttls(
            registry,
            config.challenge_ttl,
            config.session_ttl,
        ))
    }

    pub fn verifier(&self) -> &Verifier<FsRegistry> {
        &self.verifier
    }
}
