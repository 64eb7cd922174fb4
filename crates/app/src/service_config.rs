use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::state::AppState;

/// Everything the handshake service needs to start
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the API listens on
    pub api_port: u16,
    /// Default log level when RUST_LOG is not set
    pub log_level: tracing::Level,
    /// Directory holding one JSON file per registered user
    pub users_path: PathBuf,
    pub challenge_ttl: Duration,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_state(state: &AppState, api_port: Option<u16>) -> Self {
        let log_level = tracing::Level::from_str(&state.config.log_level).unwrap_or_else(|_| {
            eprintln!(
                "Warning: unknown log level '{}', using info",
                state.config.log_level
            );
            tracing::Level::INFO
        });

        Self {
            api_port: api_port.unwrap_or(state.config.api_port),
            log_level,
            users_path: state.users_path.clone(),
            challenge_ttl: Duration::from_secs(state.config.challenge_ttl_secs),
            session_ttl: Duration::from_secs(state.config.session_ttl_secs),
        }
    }
}
