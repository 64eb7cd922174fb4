use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

use locket::http_server::api::client::{ApiClient, ApiError};
use locket::AppState;

/// Resolve the remote URL for the API client.
///
/// Priority: explicit `--remote` flag > config file `api_port` > hardcoded 5001.
pub fn resolve_remote(explicit: Option<Url>, config_path: Option<PathBuf>) -> Url {
    if let Some(url) = explicit {
        return url;
    }
    if let Ok(state) = AppState::load(config_path) {
        if let Ok(url) = Url::parse(&format!("http://localhost:{}", state.config.api_port)) {
            return url;
        }
    }
    Url::parse("http://localhost:5001").expect("hardcoded URL must parse")
}

/// Default log level for this run; RUST_LOG still overrides it.
///
/// The service logs at the configured level. One-shot commands only surface
/// warnings so their stdout output stays readable.
pub fn resolve_log_level(serving: bool, config_path: Option<PathBuf>) -> tracing::Level {
    if !serving {
        return tracing::Level::WARN;
    }
    AppState::load(config_path)
        .ok()
        .and_then(|state| tracing::Level::from_str(&state.config.log_level).ok())
        .unwrap_or(tracing::Level::INFO)
}

#[derive(Clone)]
pub struct OpContext {
    /// API client (always initialized with default or custom URL)
    pub client: ApiClient,
    /// Optional custom config path (defaults to ~/.locket)
    pub config_path: Option<PathBuf>,
    /// Passphrase from `--passphrase` or LOCKET_PASSPHRASE
    pub passphrase: Option<String>,
}

impl OpContext {
    /// Create context with custom remote URL and optional config path
    pub fn new(
        remote: Url,
        config_path: Option<PathBuf>,
        passphrase: Option<String>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(&remote)?,
            config_path,
            passphrase,
        })
    }

    pub fn passphrase(&self) -> Result<&str, MissingPassphrase> {
        self.passphrase.as_deref().ok_or(MissingPassphrase)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("a passphrase is required: pass --passphrase or set LOCKET_PASSPHRASE")]
pub struct MissingPassphrase;

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
