//! Backend error types.

use thiserror::Error;

/// Error type for catalog and profile requests.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The body could not be decoded into the expected shape.
    #[error("Invalid response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Coarse failure classification, cheap to clone into UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Status,
    Parse,
}

impl CatalogError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CatalogError::Network(_) => FailureKind::Network,
            CatalogError::Status { .. } => FailureKind::Status,
            CatalogError::Parse(_) | CatalogError::InvalidUrl(_) => FailureKind::Parse,
        }
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Network(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            CatalogError::Status { status, .. } => *status >= 500,
            CatalogError::Parse(_) | CatalogError::InvalidUrl(_) => false,
        }
    }
}

/// Result type alias using CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;
