use std::{fs, path::PathBuf};

use common::crypto::{CryptoError, KeyVault, ProtectedKeyRecord, VaultError, DEFAULT_KDF_ITERATIONS};
use common::identity::{generate_identity, Credential, Identity, IdentityError};
use serde::{Deserialize, Serialize};

use crate::disk::write_atomic;
use crate::registry::FsRegistry;
use crate::store::EnvelopeStore;

pub const APP_NAME: &str = "locket";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const IDENTITY_FILE_NAME: &str = "identity.json";
pub const ENVELOPES_DIR_NAME: &str = "envelopes";
pub const USERS_DIR_NAME: &str = "users";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the handshake API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Default log directive, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seconds an issued login challenge stays valid
    #[serde(default = "default_challenge_ttl_secs")]
    pub challenge_ttl_secs: u64,
    /// Seconds an access token stays valid
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// PBKDF2 rounds used when protecting a new identity
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
}

fn default_api_port() -> u16 {
    5001
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_challenge_ttl_secs() -> u64 {
    common::auth::DEFAULT_CHALLENGE_TTL.as_secs()
}

fn default_session_ttl_secs() -> u64 {
    common::auth::DEFAULT_SESSION_TTL.as_secs()
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_KDF_ITERATIONS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            log_level: default_log_level(),
            challenge_ttl_secs: default_challenge_ttl_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            kdf_iterations: default_kdf_iterations(),
        }
    }
}

/// The local user's identity as stored in `identity.json`
///
/// Public fields sit next to the sealed private key in one flat object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFile {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(flatten)]
    pub protected_key: ProtectedKeyRecord,
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the locket directory (~/.locket)
    pub locket_dir: PathBuf,
    /// Path to the local identity file
    pub identity_path: PathBuf,
    /// Path to the envelope directory
    pub envelopes_path: PathBuf,
    /// Path to the server-side user registry
    pub users_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the locket directory path (custom or default ~/.locket)
    pub fn locket_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new locket directory with a fresh identity
    ///
    /// The private key is sealed under `passphrase` before anything touches disk.
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
        alias: &str,
        passphrase: &str,
    ) -> Result<(Self, Identity), StateError> {
        let locket_dir = Self::locket_dir(custom_path)?;

        if locket_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let config = config.unwrap_or_default();
        let vault = KeyVault::new(config.kdf_iterations)?;

        let (public_key, secret_key) = generate_identity()?;
        let identity = Identity::new(alias, public_key)?;
        let protected_key = vault.protect(&secret_key, passphrase)?;

        fs::create_dir_all(&locket_dir)?;

        let envelopes_path = locket_dir.join(ENVELOPES_DIR_NAME);
        fs::create_dir_all(&envelopes_path)?;
        let users_path = locket_dir.join(USERS_DIR_NAME);
        fs::create_dir_all(&users_path)?;

        let identity_path = locket_dir.join(IDENTITY_FILE_NAME);
        let identity_file = IdentityFile {
            identity: identity.clone(),
            protected_key,
        };
        write_atomic(&identity_path, &serde_json::to_vec_pretty(&identity_file)?)?;

        let config_path = locket_dir.join(CONFIG_FILE_NAME);
        write_atomic(&config_path, toml::to_string_pretty(&config)?.as_bytes())?;

        tracing::info!(user_id = %identity.user_id, "initialized locket directory");
        Ok((
            Self {
                locket_dir,
                identity_path,
                envelopes_path,
                users_path,
                config_path,
                config,
            },
            identity,
        ))
    }

    /// Load existing state from the locket directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let locket_dir = Self::locket_dir(custom_path)?;

        if !locket_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let identity_path = locket_dir.join(IDENTITY_FILE_NAME);
        let envelopes_path = locket_dir.join(ENVELOPES_DIR_NAME);
        let users_path = locket_dir.join(USERS_DIR_NAME);
        let config_path = locket_dir.join(CONFIG_FILE_NAME);

        if !identity_path.exists() {
            return Err(StateError::MissingFile(IDENTITY_FILE_NAME.to_string()));
        }
        if !envelopes_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", ENVELOPES_DIR_NAME)));
        }
        if !users_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", USERS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            locket_dir,
            identity_path,
            envelopes_path,
            users_path,
            config_path,
            config,
        })
    }

    /// Read `identity.json`, checking the stored id against the stored key
    pub fn load_identity(&self) -> Result<IdentityFile, StateError> {
        let data = fs::read(&self.identity_path)?;
        let file: IdentityFile = serde_json::from_slice(&data)?;
        file.identity.validate()?;
        Ok(file)
    }

    /// Unlock the local private key with `passphrase`
    pub fn unlock(&self, passphrase: &str) -> Result<Credential, StateError> {
        let file = self.load_identity()?;
        let vault = KeyVault::new(self.config.kdf_iterations)?;
        let credential = Credential::unlock(&vault, &file.protected_key, passphrase)?;

        if credential.user_id() != file.identity.user_id {
            return Err(StateError::Identity(IdentityError::UserIdMismatch {
                user_id: file.identity.user_id,
            }));
        }
        Ok(credential)
    }

    pub fn envelopes(&self) -> EnvelopeStore {
        EnvelopeStore::new(self.envelopes_path.clone())
    }

    pub fn registry(&self) -> FsRegistry {
        FsRegistry::new(self.users_path.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("locket directory not initialized. Run 'locket init' first")]
    NotInitialized,

    #[error("locket directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("key vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locket");

        let (state, identity) = AppState::init(Some(path.clone()), None, "alice", "pw").unwrap();
        assert!(state.identity_path.exists());
        assert!(state.envelopes_path.is_dir());

        let loaded = AppState::load(Some(path)).unwrap();
        assert_eq!(loaded.config, AppConfig::default());
        assert_eq!(loaded.load_identity().unwrap().identity, identity);

        let credential = loaded.unlock("pw").unwrap();
        assert_eq!(credential.user_id(), identity.user_id);
    }

    #[test]
    fn test_identity_file_is_flat() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = AppState::init(Some(dir.path().join("l")), None, "alice", "pw").unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&state.identity_path).unwrap()).unwrap();
        for field in ["user_id", "alias", "public_key", "encrypted_private_key", "salt", "iv"] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
    }

    #[test]
    fn test_wrong_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = AppState::init(Some(dir.path().join("l")), None, "alice", "pw").unwrap();
        assert!(matches!(
            state.unlock("nope"),
            Err(StateError::Identity(IdentityError::Crypto(
                CryptoError::Authentication
            )))
        ));
    }

    #[test]
    fn test_double_init_and_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l");
        AppState::init(Some(path.clone()), None, "alice", "pw").unwrap();
        assert!(matches!(
            AppState::init(Some(path), None, "alice", "pw"),
            Err(StateError::AlreadyInitialized)
        ));
        assert!(matches!(
            AppState::load(Some(dir.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_weak_kdf_config_refused() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            kdf_iterations: 10,
            ..Default::default()
        };
        assert!(matches!(
            AppState::init(Some(dir.path().join("l")), Some(config), "alice", "pw"),
            Err(StateError::Vault(_))
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str("api_port = 7000").unwrap();
        assert_eq!(config.api_port, 7000);
        assert_eq!(config.session_ttl_secs, 1800);
        assert_eq!(config.kdf_iterations, DEFAULT_KDF_ITERATIONS);
    }
}
