use std::path::PathBuf;

use clap::Args;

use common::crypto::{CryptoError, PublicKey};
use locket::{AppState, StateError, StoreError};

#[derive(Args, Debug, Clone)]
pub struct Open {
    /// File id of the sealed file
    pub file_id: String,

    /// Where to write the plaintext (defaults to the stored filename)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Owner's public key (base64 or PEM), required when opening a file shared with you
    #[arg(long)]
    pub owner_public_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Passphrase(#[from] crate::cli::op::MissingPassphrase),
    #[error("invalid owner public key: {0}")]
    PublicKey(#[from] CryptoError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("failed to write plaintext: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Open {
    type Error = OpenError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let owner_public = self
            .owner_public_key
            .as_deref()
            .map(PublicKey::parse)
            .transpose()?;

        let state = AppState::load(ctx.config_path.clone())?;
        let mut credential = state.unlock(ctx.passphrase()?)?;

        let result = state
            .envelopes()
            .open(&credential, &self.file_id, owner_public.as_ref());
        credential.destroy();
        let (envelope, plaintext) = result?;

        let out = self
            .out
            .clone()
            .unwrap_or_else(|| PathBuf::from(envelope.filename()));
        std::fs::write(&out, &plaintext)?;

        Ok(format!(
            "Wrote {} bytes to {}",
            plaintext.len(),
            out.display()
        ))
    }
}
