//! Local directory backend.

use super::{ObjectReader, StorageError, StorageReader, StorageResult};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Map an object name to a path under the root.
    ///
    /// Only plain relative names are accepted; `..`, `.` and absolute
    /// components would let a client escape the root.
    fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(name);
        let plain = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageReader for FsStorage {
    async fn open_object(&self, name: &str) -> StorageResult<ObjectReader> {
        let path = self.path_for(name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StorageError::NotFound(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        let file = fs::File::open(&path).await?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn read_all(mut reader: ObjectReader) -> Vec<u8> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_open_nested_object() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("backup")).unwrap();
        std::fs::write(tmp.path().join("backup/chunk1"), b"ABCDE").unwrap();

        let storage = FsStorage::new(tmp.path());
        let reader = storage.open_object("backup/chunk1").await.unwrap();
        assert_eq!(read_all(reader).await, b"ABCDE");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path());
        let err = storage.open_object("missing/obj").await.err().unwrap();
        assert!(matches!(err, StorageError::NotFound(name) if name == "missing/obj"));
    }

    #[tokio::test]
    async fn test_directory_is_not_an_object() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("dir")).unwrap();
        let storage = FsStorage::new(tmp.path());
        let err = storage.open_object("dir").await.err().unwrap();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path().join("root"));
        for name in ["../secret", "/etc/passwd", "a/../../b", "./a", ""] {
            let err = storage.open_object(name).await.err().unwrap();
            assert!(
                matches!(err, StorageError::InvalidName(_)),
                "{:?} should be rejected",
                name
            );
        }
    }
}
