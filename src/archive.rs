//! Opaque storage for uploaded package archives, keyed by `program_path`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Error;

#[async_trait]
pub trait ArchiveStore: Send + Sync {
    async fn put(&self, key: &str, content: Vec<u8>) -> Result<(), Error>;

    /// Fails with [`Error::NotFound`] when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, Error>;

    /// Removes every stored archive.
    async fn clear(&self) -> Result<(), Error>;
}

pub fn archive_key(package_name: &str, version: &str) -> String {
    format!("packages/{}/{}.zip", package_name, version)
}

#[derive(Debug, Default)]
pub struct MemoryArchiveStore {
    archives: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchiveStore {
    async fn put(&self, key: &str, content: Vec<u8>) -> Result<(), Error> {
        self.archives.write().await.insert(key.to_string(), content);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        self.archives
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Archive {} not found", key)))
    }

    async fn clear(&self) -> Result<(), Error> {
        self.archives.write().await.clear();
        Ok(())
    }
}
