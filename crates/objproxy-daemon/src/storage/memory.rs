use super::{ObjectReader, StorageError, StorageReader, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::Cursor;

/// In-memory object map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.objects.write().insert(name.into(), data.into());
    }

    pub fn with_object(self, name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(name, data);
        self
    }
}

#[async_trait]
impl StorageReader for MemoryStorage {
    async fn open_object(&self, name: &str) -> StorageResult<ObjectReader> {
        let data = self
            .objects
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(data)))
    }
}
