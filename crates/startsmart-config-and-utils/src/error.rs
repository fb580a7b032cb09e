//! Errors raised while locating and loading application settings.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A setting parsed but holds an unusable value.
    #[error("Invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    /// A URL-valued setting does not parse.
    #[error("Invalid URL in {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    /// The config file is not the JSON document `Config` expects.
    #[error("Malformed config file {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or creating application files failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,
}

pub type CoreResult<T> = Result<T, CoreError>;
