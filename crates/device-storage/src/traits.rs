//! Storage trait definitions.

use crate::StorageResult;
use async_trait::async_trait;

/// Asynchronous string key-value store persisted on the device.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store a value, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value. Returns whether a value was present.
    async fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists.
    async fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
