use clap::Args;

use locket::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Whoami {
    /// Print only the public key, PEM armored, for sending to others
    #[arg(long)]
    pub pem: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum WhoamiError {
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Whoami {
    type Error = WhoamiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let identity = state.load_identity()?.identity;
        if self.pem {
            return Ok(identity.public_key.to_pem().trim_end().to_string());
        }

        let mut lines = vec![
            format!("alias:      {}", identity.alias),
            format!("user id:    {}", identity.user_id),
            format!("public key: {}", identity.public_key.to_base64()),
        ];
        if let Some(name) = &identity.name {
            lines.push(format!("name:       {}", name));
        }
        if let Some(email) = &identity.email {
            lines.push(format!("email:      {}", email));
        }
        Ok(lines.join("\n"))
    }
}
