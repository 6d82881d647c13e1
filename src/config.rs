//! Ledger Configuration
//!
//! Selects the persistence backend and the log directory. Stored as JSON in
//! `ledger_config.json` under the platform data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::repository::{
    FileKv, LocalBackend, MemoryKv, PersistenceError, RemoteBackend, RestTableClient, SqliteKv,
    TodoPersistence,
};

pub const CONFIG_FILE_NAME: &str = "ledger_config.json";
pub const APP_DIR_NAME: &str = "todo-ledger";
pub const REMOTE_URL_ENV: &str = "TODO_LEDGER_REMOTE_URL";
pub const REMOTE_TOKEN_ENV: &str = "TODO_LEDGER_REMOTE_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the platform data directory")]
    NoDataDir,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Remote backend needs both a url and a token")]
    IncompleteRemote,

    #[error("Failed to open {backend} backend: {source}")]
    Backend {
        backend: &'static str,
        #[source]
        source: PersistenceError,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where todos and history are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Nothing survives the process
    Memory,
    /// One JSON file per blob
    Files { dir: PathBuf },
    Sqlite { path: PathBuf },
    /// Hosted `todos` / `todo_history` tables
    Remote { url: String, token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub backend: BackendConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        let backend = match default_data_dir() {
            Ok(dir) => BackendConfig::Sqlite {
                path: dir.join("ledger.db"),
            },
            Err(_) => BackendConfig::Memory,
        };
        Self { backend, log_dir: None }
    }
}

impl LedgerConfig {
    /// Read `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` (or the default location) and apply environment overrides
    pub fn resolve(path: Option<&Path>) -> ConfigResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        let mut config = Self::load(&path)?;
        config.apply_remote_override(
            std::env::var(REMOTE_URL_ENV).ok(),
            std::env::var(REMOTE_TOKEN_ENV).ok(),
        )?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Switch to the remote backend when both values are present.
    ///
    /// A url without a token (or the reverse) is rejected.
    pub fn apply_remote_override(&mut self, url: Option<String>, token: Option<String>) -> ConfigResult<()> {
        let url = url.filter(|s| !s.trim().is_empty());
        let token = token.filter(|s| !s.trim().is_empty());
        match (url, token) {
            (Some(url), Some(token)) => {
                tracing::info!("Remote backend selected from environment: {}", url);
                self.backend = BackendConfig::Remote { url, token };
                Ok(())
            }
            (None, None) => Ok(()),
            _ => Err(ConfigError::IncompleteRemote),
        }
    }

    /// Log directory, defaulting to `<data dir>/logs`
    pub fn log_dir(&self) -> ConfigResult<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_data_dir()?.join("logs")),
        }
    }
}

pub fn default_data_dir() -> ConfigResult<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(ConfigError::NoDataDir)
}

pub fn default_config_path() -> ConfigResult<PathBuf> {
    Ok(default_data_dir()?.join(CONFIG_FILE_NAME))
}

/// Build the persistence backend described by `config`
pub fn open_backend(config: &BackendConfig) -> ConfigResult<Arc<dyn TodoPersistence>> {
    let backend: Arc<dyn TodoPersistence> = match config {
        BackendConfig::Memory => Arc::new(LocalBackend::new(MemoryKv::new())),
        BackendConfig::Files { dir } => {
            let kv = FileKv::open(dir.clone()).map_err(|source| ConfigError::Backend {
                backend: "files",
                source,
            })?;
            Arc::new(LocalBackend::new(kv))
        }
        BackendConfig::Sqlite { path } => {
            let kv = SqliteKv::open(path).map_err(|source| ConfigError::Backend {
                backend: "sqlite",
                source,
            })?;
            Arc::new(LocalBackend::new(kv))
        }
        BackendConfig::Remote { url, token } => {
            if url.trim().is_empty() || token.trim().is_empty() {
                return Err(ConfigError::IncompleteRemote);
            }
            Arc::new(RemoteBackend::new(RestTableClient::new(url.clone(), token.clone())))
        }
    };
    tracing::info!("Opened {} backend", backend.name());
    Ok(backend)
}
