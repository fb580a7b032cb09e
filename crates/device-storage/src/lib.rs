//! Persisted key-value storage for the StartSmart client.
//!
//! Backends:
//! - **File**: one JSON document under the application directory
//! - **Memory**: volatile map, used for ephemeral runs and tests

mod file;
mod keys;
mod memory;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::KeyValueStore;

use startsmart_config_and_utils::Paths;
use std::sync::Arc;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Stored data has an unexpected shape
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default on-device storage for the given application paths.
pub fn create_storage(paths: &Paths) -> Arc<dyn KeyValueStore> {
    Arc::new(FileStorage::new(paths.storage_file()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_storage_uses_storage_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let storage = create_storage(&paths);
        storage.set(StorageKeys::USER, "{}").await.unwrap();

        assert!(paths.storage_file().exists());
        assert!(storage.has(StorageKeys::USER).await.unwrap());
    }
}
