//! Authentication error types.

use thiserror::Error;

/// Coarse classification of an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureKind {
    InvalidCredential,
    EmailInUse,
    WeakPassword,
    Cancelled,
    Other,
}

impl AuthFailureKind {
    /// Map an Identity Toolkit error message (`"WEAK_PASSWORD : ..."`) to a kind.
    pub fn from_code(code: &str) -> Self {
        let code = code.split([' ', ':']).next().unwrap_or_default();
        match code {
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND"
            | "USER_DISABLED" | "INVALID_EMAIL" => AuthFailureKind::InvalidCredential,
            "EMAIL_EXISTS" => AuthFailureKind::EmailInUse,
            "WEAK_PASSWORD" => AuthFailureKind::WeakPassword,
            _ => AuthFailureKind::Other,
        }
    }
}

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity provider refused the request
    #[error("Identity provider rejected request: {code}")]
    Rejected { kind: AuthFailureKind, code: String },

    /// Federated sign-in was abandoned before a credential was produced
    #[error("Sign-in cancelled")]
    Cancelled,

    /// The operation needs a signed-in user
    #[error("Not signed in")]
    NotSignedIn,

    /// Caller input failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend profile API failed
    #[error("Backend error: {0}")]
    Backend(#[from] backend_api::CatalogError),

    /// Session store refused the user
    #[error("Session error: {0}")]
    Session(#[from] session_store::SessionError),

    /// Persisting provider state failed
    #[error("Storage error: {0}")]
    Storage(#[from] device_storage::StorageError),
}

impl AuthError {
    pub fn kind(&self) -> AuthFailureKind {
        match self {
            AuthError::Rejected { kind, .. } => *kind,
            AuthError::Cancelled => AuthFailureKind::Cancelled,
            _ => AuthFailureKind::Other,
        }
    }

    /// Check if this is a transient error (network issues, server errors).
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            AuthError::Backend(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
