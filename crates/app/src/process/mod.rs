pub mod utils;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

use crate::http_server;
use crate::{ServiceConfig, ServiceState};

/// Handle for gracefully shutting down the handshake service.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    server: tokio::task::JoinHandle<()>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until the service shuts down (via signal or explicit shutdown).
    pub async fn wait(self) {
        let _ = self.graceful_waiter.await;

        if timeout(FINAL_SHUTDOWN_TIMEOUT, self.server).await.is_err() {
            tracing::error!(
                "Failed to shut down within {} seconds",
                FINAL_SHUTDOWN_TIMEOUT.as_secs()
            );
            std::process::exit(4);
        }
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Install the global subscriber: compact fmt on stderr, filtered by RUST_LOG
/// with `level` as the default directive.
///
/// Returns a guard that must be kept alive for the duration of the program.
pub fn init_logging(level: tracing::Level) -> tracing_appender::non_blocking::WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(writer)
        .with_filter(env_filter);

    // a second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(stderr_layer).try_init();
    guard
}

/// Create state and spawn the API server, returning the state handle.
pub async fn start_service(
    service_config: &ServiceConfig,
) -> anyhow::Result<(ServiceState, ShutdownHandle)> {
    let (graceful_waiter, shutdown_tx, shutdown_rx) = utils::graceful_shutdown_blocker()?;
    let state = ServiceState::from_config(service_config);

    let api_addr = SocketAddr::from(([0, 0, 0, 0], service_config.api_port));
    let api_config = http_server::Config::new(api_addr, service_config.log_level);
    let api_state = state.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = http_server::run_api(api_config, api_state, shutdown_rx).await {
            tracing::error!("API server error: {}", e);
        }
    });

    tracing::info!(
        port = service_config.api_port,
        challenge_ttl_secs = service_config.challenge_ttl.as_secs(),
        session_ttl_secs = service_config.session_ttl.as_secs(),
        "handshake service running"
    );

    let handle = ShutdownHandle {
        graceful_waiter,
        server,
        shutdown_tx,
    };
    Ok((state, handle))
}

/// Run the handshake service until a shutdown signal arrives.
///
/// Expects the caller to have installed logging with [`init_logging`].
pub async fn spawn_service(service_config: &ServiceConfig) -> anyhow::Result<()> {
    utils::register_panic_logger();
    utils::report_build_info();

    let (_, handle) = start_service(service_config).await?;
    handle.wait().await;
    Ok(())
}
