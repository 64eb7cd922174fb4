// Service modules
pub mod http_server;
pub mod process;
pub mod registry;
pub mod service_config;
pub mod service_state;

// Local state (configuration, identity, envelopes)
mod disk;
pub mod state;
pub mod store;

pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
pub use state::{AppConfig, AppState, IdentityFile, StateError};
pub use store::{EnvelopeStore, StoreError};
