use std::path::PathBuf;

use clap::Args;

use locket::{AppState, StateError, StoreError};

#[derive(Args, Debug, Clone)]
pub struct Seal {
    /// File to encrypt
    pub path: PathBuf,

    /// Tag to attach (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error(transparent)]
    Passphrase(#[from] crate::cli::op::MissingPassphrase),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Seal {
    type Error = SealError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let mut credential = state.unlock(ctx.passphrase()?)?;

        let result = state.envelopes().seal(&credential, &self.path, self.tags.clone());
        credential.destroy();
        let envelope = result?;

        Ok(format!(
            "Sealed {} ({} bytes, {})\n  file id: {}",
            envelope.filename(),
            envelope.size(),
            envelope.mimetype(),
            envelope.file_id()
        ))
    }
}
