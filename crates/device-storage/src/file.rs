//! File-backed storage.
//!
//! All keys live in one JSON object on disk. Writes go to a sibling temp file
//! that is renamed over the original, so a crash never leaves a torn file.
//! A document that no longer parses fails reads, and the next write moves it
//! to `<name>.json.corrupt` and starts a fresh one.

use crate::{KeyValueStore, StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Key-value store persisted as a single JSON document.
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> StorageResult<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            other => Err(StorageError::Encoding(format!(
                "expected a JSON object in {}, found {}",
                self.path.display(),
                json_kind(&other)
            ))),
        }
    }

    /// Like `read_all`, but an unparseable document is moved aside and read as
    /// empty so the caller's write replaces it.
    async fn read_for_update(&self) -> StorageResult<Map<String, Value>> {
        match self.read_all().await {
            Err(e @ (StorageError::Json(_) | StorageError::Encoding(_))) => {
                let aside = self.path.with_extension("json.corrupt");
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    aside = %aside.display(),
                    "Replacing unreadable storage document"
                );
                tokio::fs::rename(&self.path, &aside).await?;
                Ok(Map::new())
            }
            other => other,
        }
    }

    async fn write_all(&self, map: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl KeyValueStore for FileStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let map = self.read_all().await?;
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(StorageError::Encoding(format!(
                "value for {} is {}, expected a string",
                key,
                json_kind(other)
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_for_update().await?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_all(&map).await?;
        debug!(key = %key, path = %self.path.display(), "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_for_update().await?;
        let existed = map.remove(key).is_some();
        if existed {
            self.write_all(&map).await?;
            debug!(key = %key, path = %self.path.display(), "Removed value");
        }
        Ok(existed)
    }
}
