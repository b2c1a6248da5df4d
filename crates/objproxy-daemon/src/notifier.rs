//! Readiness and liveness notifications for an external supervisor.
//!
//! Speaks the sd_notify datagram protocol: `READY=1` once at startup,
//! `WATCHDOG=1` on every heartbeat, `STOPPING=1` on shutdown.

use objproxy_config::SupervisorConfig;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::Path;
use tracing::{debug, warn};

pub struct Notifier {
    socket: Option<UnixDatagram>,
}

impl Notifier {
    /// A notifier that sends nothing.
    pub fn disabled() -> Self {
        Self { socket: None }
    }

    /// Connect to the supervisor socket at `path`.
    ///
    /// A leading `@` names a Linux abstract socket.
    pub fn connect(path: &Path) -> io::Result<Self> {
        let socket = UnixDatagram::unbound()?;
        connect_socket(&socket, path)?;
        debug!(path = %path.display(), "connected to supervisor notify socket");
        Ok(Self {
            socket: Some(socket),
        })
    }

    /// Build the notifier from supervisor settings.
    ///
    /// No socket configured yields a disabled notifier. A socket that cannot
    /// be reached is an error only in strict mode.
    pub fn from_config(config: &SupervisorConfig) -> io::Result<Self> {
        let Some(path) = config.notify_socket_path() else {
            return Ok(Self::disabled());
        };
        match Self::connect(&path) {
            Ok(notifier) => Ok(notifier),
            Err(e) if !config.strict => {
                warn!(path = %path.display(), error = %e, "supervisor notifications disabled");
                Ok(Self::disabled())
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.socket.is_some()
    }

    pub fn ready(&self) -> io::Result<()> {
        self.send("READY=1")
    }

    pub fn watchdog(&self) -> io::Result<()> {
        self.send("WATCHDOG=1")
    }

    pub fn stopping(&self) -> io::Result<()> {
        self.send("STOPPING=1")
    }

    fn send(&self, state: &str) -> io::Result<()> {
        match &self.socket {
            Some(socket) => socket.send(state.as_bytes()).map(|_| ()),
            None => Ok(()),
        }
    }
}

#[cfg(target_os = "linux")]
fn connect_socket(socket: &UnixDatagram, path: &Path) -> io::Result<()> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::net::SocketAddr;

    match path.as_os_str().as_bytes().strip_prefix(b"@") {
        Some(name) => socket.connect_addr(&SocketAddr::from_abstract_name(name)?),
        None => socket.connect(path),
    }
}

#[cfg(not(target_os = "linux"))]
fn connect_socket(socket: &UnixDatagram, path: &Path) -> io::Result<()> {
    socket.connect(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disabled_is_noop() {
        let notifier = Notifier::disabled();
        assert!(!notifier.is_enabled());
        notifier.ready().unwrap();
        notifier.watchdog().unwrap();
    }

    #[test]
    fn test_sends_states() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notify.sock");
        let supervisor = UnixDatagram::bind(&path).unwrap();

        let notifier = Notifier::connect(&path).unwrap();
        notifier.ready().unwrap();
        notifier.watchdog().unwrap();

        let mut buf = [0u8; 64];
        let n = supervisor.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"READY=1");
        let n = supervisor.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"WATCHDOG=1");
    }

    #[test]
    fn test_connect_missing_socket_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(Notifier::connect(&tmp.path().join("absent.sock")).is_err());
    }

    #[test]
    fn test_from_config_strict_mode() {
        let tmp = TempDir::new().unwrap();
        let mut config = SupervisorConfig {
            notify_socket: Some(tmp.path().join("absent.sock")),
            ..SupervisorConfig::default()
        };

        let lenient = Notifier::from_config(&config).unwrap();
        assert!(!lenient.is_enabled());

        config.strict = true;
        assert!(Notifier::from_config(&config).is_err());
    }
}
