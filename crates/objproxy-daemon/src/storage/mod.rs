//! Storage collaborators
//!
//! The daemon only ever reads objects by name. Backends:
//! - `fs`: objects are files under a root directory
//! - `memory`: in-process map, for tests and demos
//! - `s3`: S3-compatible object store (feature `s3`)

use async_trait::async_trait;
use objproxy_config::{StorageBackend, StorageConfig};
use std::sync::Arc;
use tokio::io::AsyncRead;

mod fs;
mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use fs::FsStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// Byte stream of one object.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object name: {0:?}")]
    InvalidName(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to an object store.
///
/// Implementations are shared across every connection task and must not
/// assume exclusive access.
#[async_trait]
pub trait StorageReader: Send + Sync {
    /// Open an object for streaming read.
    async fn open_object(&self, name: &str) -> StorageResult<ObjectReader>;
}

/// Build the configured storage collaborator.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn StorageReader>> {
    match config.backend {
        StorageBackend::Fs => Ok(Arc::new(FsStorage::new(&config.root))),
        #[cfg(feature = "s3")]
        StorageBackend::S3 => Ok(Arc::new(S3Storage::new(config).await?)),
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => Err(StorageError::Backend(
            "s3 backend requested but objproxy was built without the `s3` feature".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_from_config_fs() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("obj"), b"data").unwrap();

        let config = StorageConfig {
            root: tmp.path().to_path_buf(),
            ..StorageConfig::default()
        };
        let storage = from_config(&config).await.unwrap();

        let mut reader = storage.open_object("obj").await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"data");
    }
}
