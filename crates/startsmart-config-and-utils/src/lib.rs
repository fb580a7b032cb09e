//! Core types, configuration, and utilities shared by the StartSmart crates.

mod config;
mod error;
mod logging;
mod notify;
mod paths;

pub use config::{
    Config, DEFAULT_API_BASE_URL, DEFAULT_FIREBASE_API_KEY, DEFAULT_IDENTITY_TOOLKIT_URL,
    DEFAULT_LOG_LEVEL, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use notify::{Notifier, RecordingNotifier, TracingNotifier};
pub use paths::Paths;
