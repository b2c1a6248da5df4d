//! Configuration types
//!
//! Every section has serde defaults so a partial file (or no file at all)
//! yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub supervisor: SupervisorConfig,
    pub storage: StorageConfig,
    pub crypto: CryptoConfig,
}

/// Listener and logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Primary (object) listener path
    pub socket_path: PathBuf,
    /// Monitoring listener port, bound on localhost
    pub stat_port: u16,
    /// Append log output to this file instead of stderr
    pub log_path: Option<PathBuf>,
    /// Default filter directive; `RUST_LOG` wins when set
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: objproxy_protocol::socket_path(),
            stat_port: 7432,
            log_path: None,
            log_level: "info".to_string(),
        }
    }
}

/// External supervisor (sd_notify) integration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Notification socket; falls back to `NOTIFY_SOCKET` when unset
    pub notify_socket: Option<PathBuf>,
    /// Fail startup when the notifier cannot be set up
    pub strict: bool,
    pub heartbeat_interval_secs: u64,
}

impl SupervisorConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            notify_socket: None,
            strict: false,
            heartbeat_interval_secs: 5,
        }
    }
}

/// Which storage collaborator serves object reads
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Fs,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the `fs` backend
    pub root: PathBuf,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub bucket: Option<String>,
    /// Key prefix prepended to every object name (`s3` backend)
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            root: PathBuf::from("/var/lib/objproxy"),
            endpoint: None,
            region: None,
            bucket: None,
            prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CryptoConfig {
    /// Raw 32-byte key file; decryption is enabled when set
    pub key_path: Option<PathBuf>,
}

impl CryptoConfig {
    pub fn enabled(&self) -> bool {
        self.key_path.is_some()
    }
}
