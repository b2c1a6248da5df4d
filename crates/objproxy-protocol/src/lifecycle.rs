use std::fs;
use std::path::{Path, PathBuf};

/// Get the socket path for the daemon
///
/// Priority:
/// 1. `OBJPROXY_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/objproxy.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/objproxy.sock` (fallback)
pub fn socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("OBJPROXY_SOCKET") {
        return PathBuf::from(path);
    }
    dirs::runtime_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("objproxy.sock")
}

pub fn remove_socket(path: &Path) {
    let _ = fs::remove_file(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_socket_path_default_name() {
        std::env::remove_var("OBJPROXY_SOCKET");
        let path = socket_path();
        assert!(path.to_string_lossy().ends_with("objproxy.sock"));
    }

    #[test]
    #[serial]
    fn test_socket_path_env_override() {
        std::env::set_var("OBJPROXY_SOCKET", "/run/custom/proxy.sock");
        let path = socket_path();
        std::env::remove_var("OBJPROXY_SOCKET");
        assert_eq!(path, PathBuf::from("/run/custom/proxy.sock"));
    }

    #[test]
    fn test_remove_socket() {
        let tmp = TempDir::new().unwrap();
        let sock_path = tmp.path().join("test.sock");
        fs::write(&sock_path, "").unwrap();
        assert!(sock_path.exists());
        remove_socket(&sock_path);
        assert!(!sock_path.exists());
        remove_socket(&sock_path); // Should not panic
    }
}
