use clap::Args;

use common::auth::{HandshakeError, UserRegistry};
use common::crypto::{CryptoError, PublicKey};
use common::identity::Credential;
use locket::http_server::api::client::LoginError;
use locket::{AppState, StateError, StoreError};

use crate::cli::op::OpContext;

#[derive(Args, Debug, Clone)]
pub struct Share {
    /// File id of the sealed file
    pub file_id: String,

    /// User id of the recipient
    #[arg(long)]
    pub user_id: String,

    /// Recipient's public key, base64 or PEM
    ///
    /// When omitted the key comes from the local user registry, or failing that
    /// from the handshake service after logging in.
    #[arg(long)]
    pub public_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error(transparent)]
    Passphrase(#[from] crate::cli::op::MissingPassphrase),
    #[error("no public key known for user {0}; pass --public-key")]
    UnknownRecipient(String),
    #[error("recipient lookup failed: {0}")]
    Remote(#[from] LoginError),
    #[error("the service rejected the signed challenge")]
    Rejected,
    #[error("invalid public key: {0}")]
    PublicKey(#[from] CryptoError),
    #[error("registry error: {0}")]
    Registry(#[from] HandshakeError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl Share {
    /// Key from `--public-key` or the local registry, if either has one.
    fn local_recipient_key(&self, state: &AppState) -> Result<Option<PublicKey>, ShareError> {
        if let Some(text) = &self.public_key {
            return Ok(Some(PublicKey::parse(text)?));
        }
        Ok(state
            .registry()
            .lookup(&self.user_id)?
            .map(|identity| identity.public_key))
    }

    async fn remote_recipient_key(
        &self,
        ctx: &OpContext,
        credential: &Credential,
    ) -> Result<PublicKey, ShareError> {
        tracing::debug!(user_id = %self.user_id, remote = %ctx.client.base_url(), "fetching recipient key");
        let handshake = ctx.client.login(credential).await?;
        let token = handshake.access_token().ok_or(ShareError::Rejected)?;
        ctx.client
            .fetch_identity(token, &self.user_id)
            .await?
            .map(|identity| identity.public_key)
            .ok_or_else(|| ShareError::UnknownRecipient(self.user_id.clone()))
    }

    async fn share_with(
        &self,
        ctx: &OpContext,
        state: &AppState,
        credential: &Credential,
    ) -> Result<(), ShareError> {
        let recipient = match self.local_recipient_key(state)? {
            Some(key) => key,
            None => self.remote_recipient_key(ctx, credential).await?,
        };
        state
            .envelopes()
            .share(credential, &self.file_id, &self.user_id, &recipient)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Share {
    type Error = ShareError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let mut credential = state.unlock(ctx.passphrase()?)?;

        let result = self.share_with(ctx, &state, &credential).await;
        credential.destroy();
        result?;

        Ok(format!("Shared {} with {}", self.file_id, self.user_id))
    }
}
