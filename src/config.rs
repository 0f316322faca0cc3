//! Application-level configuration loading: WebSocket join timeout and storage backend choice.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_DUEL_CONFIG_PATH";
/// Environment variable that overrides the configured storage backend.
const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";
/// Time a fresh WebSocket gets to send its `join` frame.
const DEFAULT_IDENTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Persistence backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store; state is lost on restart.
    Memory,
    /// MongoDB store supervised in the background.
    Mongo,
}

impl Default for StorageBackend {
    fn default() -> Self {
        if cfg!(feature = "mongo-store") {
            StorageBackend::Mongo
        } else {
            StorageBackend::Memory
        }
    }
}

impl StorageBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(StorageBackend::Memory),
            "mongo" | "mongodb" => Some(StorageBackend::Mongo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    identification_timeout: Duration,
    storage: StorageBackend,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults, then apply
    /// the `STORAGE_BACKEND` override.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        storage = ?app_config.storage,
                        identification_timeout_secs = app_config.identification_timeout.as_secs(),
                        "loaded config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_storage_override(env::var(STORAGE_BACKEND_ENV).ok().as_deref())
    }

    /// Time a new connection has to identify itself.
    pub fn identification_timeout(&self) -> Duration {
        self.identification_timeout
    }

    /// Backend the server should run on.
    pub fn storage(&self) -> StorageBackend {
        self.storage
    }

    fn with_storage_override(mut self, raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
            return self;
        };

        match StorageBackend::parse(raw) {
            Some(storage) => {
                info!(?storage, "storage backend overridden from environment");
                self.storage = storage;
            }
            None => warn!(
                value = raw,
                "unknown {STORAGE_BACKEND_ENV} value; keeping configured backend"
            ),
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            identification_timeout: DEFAULT_IDENTIFICATION_TIMEOUT,
            storage: StorageBackend::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    identification_timeout_secs: Option<u64>,
    #[serde(default)]
    storage: Option<StorageBackend>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            identification_timeout: value
                .identification_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.identification_timeout),
            storage: value.storage.unwrap_or(defaults.storage),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
