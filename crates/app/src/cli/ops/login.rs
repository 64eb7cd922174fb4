use clap::Args;

use common::auth::HandshakeState;
use locket::http_server::api::client::{ApiError, LoginError};
use locket::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Login {
    /// Register the local identity with the service first
    #[arg(long)]
    pub register: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginOpError {
    #[error(transparent)]
    Passphrase(#[from] crate::cli::op::MissingPassphrase),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("registration failed: {0}")]
    Register(#[from] ApiError),
    #[error("login failed: {0}")]
    Login(#[from] LoginError),
    #[error("the service rejected the signed challenge")]
    Rejected,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Login {
    type Error = LoginOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;

        if self.register {
            let identity = state.load_identity()?.identity;
            ctx.client.ensure_registered(&identity).await?;
        }

        let mut credential = state.unlock(ctx.passphrase()?)?;
        let result = ctx.client.login(&credential).await;
        credential.destroy();
        let handshake = result?;

        match (handshake.state(), handshake.access_token()) {
            (HandshakeState::Verified, Some(token)) => Ok(format!(
                "Logged in as {}\n  access token: {}",
                handshake.user_id(),
                token
            )),
            _ => Err(LoginOpError::Rejected),
        }
    }
}
