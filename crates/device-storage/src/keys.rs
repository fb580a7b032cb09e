//! Storage key constants.

/// Storage keys used by the application.
pub struct StorageKeys;

impl StorageKeys {
    /// Serialized record of the signed-in user (JSON object).
    pub const USER: &'static str = "user";

    /// Identity provider tokens and user, kept separately from `USER`.
    pub const AUTH: &'static str = "auth_user";
}
