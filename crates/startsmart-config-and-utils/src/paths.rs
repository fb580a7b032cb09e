//! File system paths.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Name of the per-user application directory under `$HOME`.
const APP_DIR_NAME: &str = ".startsmart";

/// Manages file system paths for the application.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for application files (~/.startsmart)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.startsmart`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir().ok_or(CoreError::NoHomeDir)?;

        Ok(Self {
            base_dir: home.join(APP_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.startsmart).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.startsmart/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the persisted key-value storage file (~/.startsmart/storage.json).
    pub fn storage_file(&self) -> PathBuf {
        self.base_dir.join("storage.json")
    }

    /// Get the logs directory (~/.startsmart/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file (~/.startsmart/logs/startsmart.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("startsmart.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
