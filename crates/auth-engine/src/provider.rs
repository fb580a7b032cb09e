//! Identity provider seam.

use crate::AuthResult;
use async_trait::async_trait;
use session_store::UserRecord;
use tokio::sync::broadcast;

/// Credential obtained from a federated sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FederatedCredential {
    /// Google ID token. An empty token means the user backed out.
    Google { id_token: String },
}

/// An external identity provider.
///
/// Every successful sign-in or sign-out is also delivered to
/// [`AuthProvider::subscribe`] receivers, along with changes the provider
/// learns about on its own. Profile updates are not auth state changes.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<UserRecord>;

    async fn sign_up_with_password(&self, email: &str, password: &str) -> AuthResult<UserRecord>;

    async fn sign_in_with_credential(
        &self,
        credential: FederatedCredential,
    ) -> AuthResult<UserRecord>;

    async fn send_password_reset(&self, email: &str) -> AuthResult<()>;

    /// Set the display name of the current user.
    async fn update_profile(&self, display_name: &str) -> AuthResult<UserRecord>;

    async fn sign_out(&self) -> AuthResult<()>;

    fn current_user(&self) -> Option<UserRecord>;

    /// Auth state changes: the signed-in user, or `None` after sign-out.
    fn subscribe(&self) -> broadcast::Receiver<Option<UserRecord>>;
}
