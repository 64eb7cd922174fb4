use clap::Args;

use locket::{spawn_service, AppState, ServiceConfig, StateError};

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Override API server port (default from config)
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("service failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let config = ServiceConfig::from_state(&state, self.port);

        spawn_service(&config)
            .await
            .map_err(|e| ServeError::Failed(e.to_string()))?;
        Ok("service ended".to_string())
    }
}
