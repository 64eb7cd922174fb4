use clap::Args;

use locket::{AppState, StateError, StoreError};

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Only list files carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let envelopes = state.envelopes().list()?;

        let lines: Vec<String> = envelopes
            .iter()
            .filter(|e| match &self.tag {
                Some(tag) => e.tags().iter().any(|t| t == tag),
                None => true,
            })
            .map(|e| {
                format!(
                    "{}  {:>10}  {}  ({} users)",
                    e.file_id(),
                    e.size(),
                    e.filename(),
                    e.authorized_users().len()
                )
            })
            .collect();

        if lines.is_empty() {
            return Ok("no sealed files".to_string());
        }
        Ok(lines.join("\n"))
    }
}
