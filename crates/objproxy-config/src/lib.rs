//! # objproxy configuration
//!
//! Typed configuration for the objproxy daemon, loaded from a TOML file and
//! then overridden from the environment.
//!
//! ```rust,no_run
//! use objproxy_config::Config;
//!
//! let config = Config::load(None)?;
//! println!("listening on {}", config.daemon.socket_path.display());
//! # Ok::<(), objproxy_config::ConfigError>(())
//! ```

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::{DEFAULT_CONFIG_PATH, ENV_LOG_PATH, ENV_NOTIFY_SOCKET, ENV_SOCKET, ENV_STAT_PORT};
