//! Loading: file (or defaults), then environment overrides, then validation.

use crate::config::{Config, StorageBackend};
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file consulted when no explicit path is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/objproxy/objproxy.toml";

pub const ENV_SOCKET: &str = "OBJPROXY_SOCKET";
pub const ENV_STAT_PORT: &str = "OBJPROXY_STAT_PORT";
pub const ENV_LOG_PATH: &str = "OBJPROXY_LOG_PATH";
pub const ENV_NOTIFY_SOCKET: &str = "NOTIFY_SOCKET";

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
    /// used if present, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No config file at {}, using defaults", DEFAULT_CONFIG_PATH);
                    Self::default()
                }
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config file {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override file values from `OBJPROXY_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(path) = std::env::var(ENV_SOCKET) {
            self.daemon.socket_path = PathBuf::from(path);
        }
        if let Ok(port) = std::env::var(ENV_STAT_PORT) {
            self.daemon.stat_port = port.parse().map_err(|_| {
                ConfigError::Invalid(format!("{} is not a valid port: {:?}", ENV_STAT_PORT, port))
            })?;
        }
        if let Ok(path) = std::env::var(ENV_LOG_PATH) {
            self.daemon.log_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.daemon.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("daemon.socket_path is empty".into()));
        }
        if self.supervisor.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "supervisor.heartbeat_interval_secs must be greater than zero".into(),
            ));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.is_none() {
            return Err(ConfigError::Invalid(
                "storage.bucket is required for the s3 backend".into(),
            ));
        }
        Ok(())
    }
}

impl crate::config::SupervisorConfig {
    /// Configured notification socket, or `NOTIFY_SOCKET` from the environment.
    pub fn notify_socket_path(&self) -> Option<PathBuf> {
        self.notify_socket
            .clone()
            .or_else(|| std::env::var_os(ENV_NOTIFY_SOCKET).map(PathBuf::from))
    }
}
