pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "locket")]
#[command(about = "Encrypt files once, share them per recipient, log in with your signing key")]
#[command(version)]
pub struct Args {
    /// Handshake service to talk to (defaults to localhost on the configured api_port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the locket config directory (defaults to ~/.locket)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Passphrase protecting the local private key
    #[arg(long, global = true, env = "LOCKET_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
