use clap::Args;

use locket::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Display name attached to the new identity
    #[arg(long)]
    pub alias: String,

    /// Port the handshake service listens on
    #[arg(long, default_value_t = 5001)]
    pub api_port: u16,

    /// PBKDF2 rounds used to seal the private key
    #[arg(long)]
    pub kdf_iterations: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Passphrase(#[from] crate::cli::op::MissingPassphrase),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let passphrase = ctx.passphrase()?;

        let mut config = AppConfig {
            api_port: self.api_port,
            ..Default::default()
        };
        if let Some(iterations) = self.kdf_iterations {
            config.kdf_iterations = iterations;
        }

        let (state, identity) =
            AppState::init(ctx.config_path.clone(), Some(config), &self.alias, passphrase)?;

        let mut lines = vec![format!(
            "Initialized locket directory at {}",
            state.locket_dir.display()
        )];
        lines.push(format!("  user id:    {}", identity.user_id));
        lines.push(format!("  public key: {}", identity.public_key.to_base64()));
        lines.push(format!("  api_port:   {}", state.config.api_port));
        Ok(lines.join("\n"))
    }
}
