// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Init, Login, Ls, Open, Seal, Serve, Share, Whoami};

command_enum! {
    (Init, Init),
    (Whoami, Whoami),
    (Seal, Seal),
    (Share, Share),
    (Open, Open),
    (Ls, Ls),
    (Login, Login),
    (Serve, Serve),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let serving = matches!(args.command, Command::Serve(_));
    let log_level = cli::op::resolve_log_level(serving, args.config_path.clone());
    let guard = locket::process::init_logging(log_level);

    // Resolve remote URL: explicit flag > config api_port > hardcoded 5001
    let remote = cli::op::resolve_remote(args.remote, args.config_path.clone());

    let code = match cli::op::OpContext::new(remote, args.config_path, args.passphrase) {
        Ok(ctx) => match args.command.execute(&ctx).await {
            Ok(output) => {
                println!("{}", output);
                0
            }
            Err(e) => {
                tracing::debug!("command failed: {:?}", e);
                eprintln!("Error: {}", e);
                1
            }
        },
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            1
        }
    };

    // exit skips destructors; flush buffered log lines first
    drop(guard);
    std::process::exit(code);
}
