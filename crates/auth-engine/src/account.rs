//! Account workflows behind the login, signup and account screens.
//!
//! Each workflow validates its input, talks to the identity provider and the
//! backend profile API, updates the session store, and surfaces the outcome
//! as a notification. The returned `Result` carries the same outcome for
//! callers that need to branch on it.

use crate::provider::{AuthProvider, FederatedCredential};
use crate::{AuthError, AuthFailureKind, AuthResult};
use backend_api::BackendClient;
use session_store::{AuthStateListener, SessionStore, UserRecord};
use startsmart_config_and_utils::Notifier;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DEFAULT_GOOGLE_NAME: &str = "Google User";

pub struct Account {
    provider: Arc<dyn AuthProvider>,
    backend: BackendClient,
    session: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
}

impl Account {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        backend: BackendClient,
        session: Arc<SessionStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            provider,
            backend,
            session,
            notifier,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn reject(&self, message: &str) -> AuthError {
        self.notifier.notify(message);
        AuthError::InvalidInput(message.to_string())
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<UserRecord> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(self.reject("Please fill all fields"));
        }

        let result = async {
            let user = self.provider.sign_in_with_password(email.trim(), password).await?;
            self.session.set_session(user.clone()).await?;
            Ok::<_, AuthError>(user)
        }
        .await;

        match result {
            Ok(user) => {
                self.notifier.notify("Login successful");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.notifier.notify(match e.kind() {
                    AuthFailureKind::InvalidCredential => "Invalid email or password",
                    _ => "Login failed. Please try again.",
                });
                Err(e)
            }
        }
    }

    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> AuthResult<UserRecord> {
        let name = name.trim();
        if name.is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(self.reject("Please fill all fields"));
        }

        let result = async {
            let created = self
                .provider
                .sign_up_with_password(email.trim(), password)
                .await?;
            let mut user = self.provider.update_profile(name).await?;
            if user.email.is_empty() {
                user.email = created.email;
            }

            if let Err(e) = self.backend.create_user(&user.email, name).await {
                warn!(error = %e, "Backend profile creation failed");
            }

            self.session.set_session(user.clone()).await?;
            Ok::<_, AuthError>(user)
        }
        .await;

        match result {
            Ok(user) => {
                info!(uid = %user.uid, "Account created");
                self.notifier.notify("Account created successfully!");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Signup failed");
                self.notifier.notify(match e.kind() {
                    AuthFailureKind::EmailInUse => "Email already in use",
                    AuthFailureKind::WeakPassword => "Password should be at least 6 characters",
                    _ => "Signup failed. Please try again.",
                });
                Err(e)
            }
        }
    }

    /// Sign in with a Google ID token.
    ///
    /// With `create_profile` set (the signup screen) a backend profile is
    /// created when none exists yet. A cancelled flow is silent.
    pub async fn google_sign_in(&self, id_token: &str, create_profile: bool) -> AuthResult<UserRecord> {
        let result = async {
            let user = self
                .provider
                .sign_in_with_credential(FederatedCredential::Google {
                    id_token: id_token.to_string(),
                })
                .await?;

            if create_profile {
                self.ensure_backend_profile(&user).await;
            }

            self.session.set_session(user.clone()).await?;
            Ok::<_, AuthError>(user)
        }
        .await;

        match result {
            Ok(user) => {
                self.notifier.notify(if create_profile {
                    "Google signup successful"
                } else {
                    "Google login successful"
                });
                Ok(user)
            }
            Err(e) if e.kind() == AuthFailureKind::Cancelled => {
                debug!("Google sign-in cancelled");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Google sign-in failed");
                self.notifier.notify("Google sign-in failed");
                Err(e)
            }
        }
    }

    async fn ensure_backend_profile(&self, user: &UserRecord) {
        let result = async {
            if self.backend.get_user_by_email(&user.email).await?.is_none() {
                let name = user
                    .display_name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(DEFAULT_GOOGLE_NAME);
                self.backend.create_user(&user.email, name).await?;
                info!(uid = %user.uid, "Backend profile created");
            }
            Ok::<_, backend_api::CatalogError>(())
        }
        .await;

        if let Err(e) = result {
            info!(error = %e, "Backend profile sync skipped");
        }
    }

    pub async fn reset_password(&self, email: &str) -> AuthResult<()> {
        if email.trim().is_empty() {
            return Err(self.reject("Please enter your email first"));
        }

        match self.provider.send_password_reset(email.trim()).await {
            Ok(()) => {
                self.notifier.notify("Password reset email sent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Password reset failed");
                self.notifier.notify("Failed to send reset email");
                Err(e)
            }
        }
    }

    pub async fn update_display_name(&self, name: &str) -> AuthResult<UserRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject("Please enter a valid name"));
        }

        if self.provider.current_user().is_none() {
            self.notifier.notify("No user found");
            return Err(AuthError::NotSignedIn);
        }

        let result = async {
            let updated = self.provider.update_profile(name).await?;
            // Keep backend fields the provider does not know about.
            let mut user = self.session.user().unwrap_or(updated);
            user.display_name = Some(name.to_string());
            self.session.set_session(user.clone()).await?;
            Ok::<_, AuthError>(user)
        }
        .await;

        match result {
            Ok(user) => {
                self.notifier.notify("Name updated successfully");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Name update failed");
                self.notifier.notify("Failed to update name");
                Err(e)
            }
        }
    }

    pub async fn update_phone(&self, phone: &str) -> AuthResult<UserRecord> {
        let phone = phone.trim();
        if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.reject("Phone must be 10 digits"));
        }

        let Some(mut user) = self.session.user() else {
            self.notifier.notify("No user found");
            return Err(AuthError::NotSignedIn);
        };

        let result = self.save_phone(&mut user, phone).await.map(|()| user);

        match result {
            Ok(user) => {
                self.notifier.notify("Phone updated successfully");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Phone update failed");
                self.notifier.notify("Error updating phone");
                Err(e)
            }
        }
    }

    async fn save_phone(&self, user: &mut UserRecord, phone: &str) -> AuthResult<()> {
        self.backend
            .update_user(
                user.backend_id.as_deref(),
                user.display_name.as_deref().unwrap_or_default(),
                phone,
            )
            .await?;
        user.phone = Some(phone.to_string());
        self.session.set_session(user.clone()).await?;
        Ok(())
    }

    /// Merge the backend profile (`_id`, phone) into the session user.
    ///
    /// Backend failures keep the local record.
    pub async fn refresh_profile(&self) -> AuthResult<Option<UserRecord>> {
        let Some(mut user) = self.session.user() else {
            return Ok(None);
        };

        match self.backend.get_user_by_email(&user.email).await {
            Ok(Some(profile)) => {
                user.backend_id = profile.id.or(user.backend_id);
                user.phone = profile.phone.or(user.phone);
                self.session.set_session(user.clone()).await?;
            }
            Ok(None) => debug!(uid = %user.uid, "No backend profile"),
            Err(e) => info!(error = %e, "Backend fetch failed, using local data only"),
        }

        Ok(Some(user))
    }

    /// Sign out of the provider and clear the session.
    ///
    /// The session is cleared even when the provider fails.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let result = self.provider.sign_out().await;
        self.session.clear_session().await;

        match result {
            Ok(()) => {
                self.notifier.notify("Signed out successfully");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign-out failed");
                self.notifier.notify("Error while signing out");
                Err(e)
            }
        }
    }

    /// Forward provider auth-state changes to the session.
    ///
    /// A signed-in user is persisted; a sign-out only updates memory.
    pub fn watch_auth_state(&self) -> JoinHandle<()> {
        let mut changes = self.provider.subscribe();
        let session = self.session.clone();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(Some(user)) => {
                        if let Err(e) = session.set_session(user).await {
                            warn!(error = %e, "Ignoring auth state change");
                        }
                    }
                    Ok(None) => session.on_auth_state_changed(None),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Auth state receiver lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use backend_api::test_util::{MockHttpServer, MockResponse};
    use device_storage::{MemoryStorage, StorageKeys};
    use parking_lot::Mutex;
    use session_store::SessionState;
    use startsmart_config_and_utils::RecordingNotifier;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Provider whose next outcome is scripted by the test.
    struct FakeProvider {
        user: Mutex<Option<UserRecord>>,
        fail_with: Mutex<Option<AuthFailureKind>>,
        fail_sign_out: Mutex<bool>,
        changes: broadcast::Sender<Option<UserRecord>>,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                user: Mutex::new(None),
                fail_with: Mutex::new(None),
                fail_sign_out: Mutex::new(false),
                changes: broadcast::channel(8).0,
            }
        }

        fn fail_with(&self, kind: AuthFailureKind) {
            *self.fail_with.lock() = Some(kind);
        }

        fn outcome(&self) -> AuthResult<()> {
            match *self.fail_with.lock() {
                Some(AuthFailureKind::Cancelled) => Err(AuthError::Cancelled),
                Some(kind) => Err(AuthError::Rejected {
                    kind,
                    code: format!("{:?}", kind),
                }),
                None => Ok(()),
            }
        }

        fn sign_in(&self, user: UserRecord) -> AuthResult<UserRecord> {
            self.outcome()?;
            *self.user.lock() = Some(user.clone());
            let _ = self.changes.send(Some(user.clone()));
            Ok(user)
        }
    }

    #[async_trait]
    impl AuthProvider for FakeProvider {
        async fn sign_in_with_password(&self, email: &str, _: &str) -> AuthResult<UserRecord> {
            self.sign_in(UserRecord::new("uid-1", email))
        }

        async fn sign_up_with_password(&self, email: &str, _: &str) -> AuthResult<UserRecord> {
            self.sign_in(UserRecord::new("uid-1", email))
        }

        async fn sign_in_with_credential(
            &self,
            credential: FederatedCredential,
        ) -> AuthResult<UserRecord> {
            let FederatedCredential::Google { id_token } = credential;
            if id_token.is_empty() {
                return Err(AuthError::Cancelled);
            }
            self.sign_in(UserRecord::new("g-1", "g@example.com"))
        }

        async fn send_password_reset(&self, _: &str) -> AuthResult<()> {
            self.outcome()
        }

        async fn update_profile(&self, display_name: &str) -> AuthResult<UserRecord> {
            self.outcome()?;
            let current = self.user.lock().clone();
            let mut user = current.ok_or(AuthError::NotSignedIn)?;
            user.display_name = Some(display_name.to_string());
            *self.user.lock() = Some(user.clone());
            Ok(user)
        }

        async fn sign_out(&self) -> AuthResult<()> {
            *self.user.lock() = None;
            let _ = self.changes.send(None);
            if *self.fail_sign_out.lock() {
                return Err(AuthError::Rejected {
                    kind: AuthFailureKind::Other,
                    code: "NETWORK".into(),
                });
            }
            Ok(())
        }

        fn current_user(&self) -> Option<UserRecord> {
            self.user.lock().clone()
        }

        fn subscribe(&self) -> broadcast::Receiver<Option<UserRecord>> {
            self.changes.subscribe()
        }
    }

    struct Harness {
        account: Account,
        provider: Arc<FakeProvider>,
        storage: Arc<MemoryStorage>,
        notifier: Arc<RecordingNotifier>,
        server: MockHttpServer,
    }

    impl Harness {
        async fn new() -> Self {
            let server = MockHttpServer::start().await;
            let provider = Arc::new(FakeProvider::new());
            let storage = Arc::new(MemoryStorage::new());
            let notifier = Arc::new(RecordingNotifier::new());
            let session = Arc::new(SessionStore::new(storage.clone(), notifier.clone()));
            let backend = BackendClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();
            let account = Account::new(provider.clone(), backend, session, notifier.clone());
            Self {
                account,
                provider,
                storage,
                notifier,
                server,
            }
        }

        fn last_message(&self) -> Option<String> {
            self.notifier.messages().last().cloned()
        }
    }

    #[tokio::test]
    async fn test_login_requires_all_fields() {
        let h = Harness::new().await;

        let err = h.account.login("", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
        assert_eq!(h.last_message().as_deref(), Some("Please fill all fields"));
        assert!(h.provider.current_user().is_none());
    }

    #[tokio::test]
    async fn test_login_success_persists_session() {
        let h = Harness::new().await;

        let user = h.account.login("ana@example.com", "secret1").await.unwrap();

        assert_eq!(h.account.session().user(), Some(user));
        assert_eq!(h.account.session().state(), SessionState::Authenticated);
        assert!(h.storage.peek(StorageKeys::USER).is_some());
        assert_eq!(h.last_message().as_deref(), Some("Login successful"));
    }

    #[tokio::test]
    async fn test_login_failure_messages() {
        let h = Harness::new().await;

        h.provider.fail_with(AuthFailureKind::InvalidCredential);
        h.account.login("ana@example.com", "x").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Invalid email or password"));

        h.provider.fail_with(AuthFailureKind::Other);
        h.account.login("ana@example.com", "x").await.unwrap_err();
        assert_eq!(
            h.last_message().as_deref(),
            Some("Login failed. Please try again.")
        );
        assert!(h.account.session().user().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_creates_backend_profile() {
        let h = Harness::new().await;
        h.server
            .route("POST", "/api/users", MockResponse::json(201, r#"{"ok":true}"#));

        let user = h
            .account
            .sign_up(" Ana ", "ana@example.com", "secret1")
            .await
            .unwrap();

        assert_eq!(user.display_name.as_deref(), Some("Ana"));
        assert_eq!(h.account.session().user(), Some(user));
        assert_eq!(h.last_message().as_deref(), Some("Account created successfully!"));

        let body: serde_json::Value =
            serde_json::from_str(&h.server.requests()[0].body).unwrap();
        assert_eq!(body["email"], "ana@example.com");
        assert_eq!(body["name"], "Ana");
    }

    #[tokio::test]
    async fn test_sign_up_survives_backend_failure() {
        let h = Harness::new().await;
        h.server
            .route("POST", "/api/users", MockResponse::json(500, "{}"));

        h.account
            .sign_up("Ana", "ana@example.com", "secret1")
            .await
            .unwrap();
        assert!(h.account.session().session().is_authenticated());
        assert_eq!(h.notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_sign_up_failure_messages() {
        let h = Harness::new().await;

        h.provider.fail_with(AuthFailureKind::EmailInUse);
        h.account.sign_up("Ana", "a@b.com", "secret1").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Email already in use"));

        h.provider.fail_with(AuthFailureKind::WeakPassword);
        h.account.sign_up("Ana", "a@b.com", "123").await.unwrap_err();
        assert_eq!(
            h.last_message().as_deref(),
            Some("Password should be at least 6 characters")
        );

        h.provider.fail_with(AuthFailureKind::Other);
        h.account.sign_up("Ana", "a@b.com", "secret1").await.unwrap_err();
        assert_eq!(
            h.last_message().as_deref(),
            Some("Signup failed. Please try again.")
        );

        h.account.sign_up("  ", "a@b.com", "secret1").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Please fill all fields"));
    }

    #[tokio::test]
    async fn test_google_signup_creates_missing_profile() {
        let h = Harness::new().await;
        h.server
            .route("GET", "/api/get-user", MockResponse::json(200, "null"));
        h.server
            .route("POST", "/api/users", MockResponse::json(201, "{}"));

        h.account.google_sign_in("token", true).await.unwrap();

        assert_eq!(h.server.hits("/api/users"), 1);
        let body: serde_json::Value =
            serde_json::from_str(&h.server.requests()[1].body).unwrap();
        assert_eq!(body["name"], "Google User");
        assert_eq!(h.last_message().as_deref(), Some("Google signup successful"));
    }

    #[tokio::test]
    async fn test_google_login_skips_backend() {
        let h = Harness::new().await;

        h.account.google_sign_in("token", false).await.unwrap();

        assert!(h.server.requests().is_empty());
        assert_eq!(h.last_message().as_deref(), Some("Google login successful"));
    }

    #[tokio::test]
    async fn test_google_cancel_is_silent() {
        let h = Harness::new().await;

        let err = h.account.google_sign_in("", true).await.unwrap_err();
        assert_eq!(err.kind(), AuthFailureKind::Cancelled);
        assert_eq!(h.notifier.count(), 0);

        h.provider.fail_with(AuthFailureKind::Other);
        h.account.google_sign_in("token", false).await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Google sign-in failed"));
    }

    #[tokio::test]
    async fn test_reset_password() {
        let h = Harness::new().await;

        h.account.reset_password(" ").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Please enter your email first"));

        h.account.reset_password("ana@example.com").await.unwrap();
        assert_eq!(h.last_message().as_deref(), Some("Password reset email sent"));

        h.provider.fail_with(AuthFailureKind::Other);
        h.account.reset_password("ana@example.com").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Failed to send reset email"));
    }

    #[tokio::test]
    async fn test_update_display_name() {
        let h = Harness::new().await;

        h.account.update_display_name("").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Please enter a valid name"));

        h.account.update_display_name("Ana").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("No user found"));

        h.account.login("ana@example.com", "secret1").await.unwrap();
        let mut with_phone = h.account.session().user().unwrap();
        with_phone.phone = Some("0123456789".into());
        h.account.session().set_session(with_phone).await.unwrap();

        let user = h.account.update_display_name("Ana Maria").await.unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Ana Maria"));
        assert_eq!(user.phone.as_deref(), Some("0123456789"));
        assert_eq!(h.last_message().as_deref(), Some("Name updated successfully"));

        h.provider.fail_with(AuthFailureKind::Other);
        h.account.update_display_name("Ana").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Failed to update name"));
    }

    #[tokio::test]
    async fn test_update_phone() {
        let h = Harness::new().await;
        h.server
            .route("PUT", "/api/users", MockResponse::json(200, r#"{"ok":true}"#));

        h.account.update_phone("12345").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Phone must be 10 digits"));
        h.account.update_phone("01234abcde").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Phone must be 10 digits"));

        h.account.login("ana@example.com", "secret1").await.unwrap();
        let user = h.account.update_phone("0123456789").await.unwrap();

        assert_eq!(user.phone.as_deref(), Some("0123456789"));
        assert_eq!(h.account.session().user(), Some(user));
        assert_eq!(h.last_message().as_deref(), Some("Phone updated successfully"));

        h.server
            .route("PUT", "/api/users", MockResponse::json(500, "{}"));
        h.account.update_phone("9876543210").await.unwrap_err();
        assert_eq!(h.last_message().as_deref(), Some("Error updating phone"));
        assert_eq!(
            h.account.session().user().unwrap().phone.as_deref(),
            Some("0123456789")
        );
    }

    #[tokio::test]
    async fn test_refresh_profile_merges_backend_fields() {
        let h = Harness::new().await;
        assert!(h.account.refresh_profile().await.unwrap().is_none());

        h.server.route(
            "GET",
            "/api/get-user",
            MockResponse::json(200, r#"{"_id":"b-1","email":"ana@example.com","phone":"0123456789"}"#),
        );
        h.account.login("ana@example.com", "secret1").await.unwrap();

        let user = h.account.refresh_profile().await.unwrap().unwrap();
        assert_eq!(user.backend_id.as_deref(), Some("b-1"));
        assert_eq!(user.phone.as_deref(), Some("0123456789"));
        assert_eq!(h.account.session().user(), Some(user));
    }

    #[tokio::test]
    async fn test_refresh_profile_keeps_local_on_backend_failure() {
        let h = Harness::new().await;
        h.server
            .route("GET", "/api/get-user", MockResponse::json(500, "{}"));
        let local = h.account.login("ana@example.com", "secret1").await.unwrap();

        assert_eq!(h.account.refresh_profile().await.unwrap(), Some(local));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_on_failure() {
        let h = Harness::new().await;
        h.account.login("ana@example.com", "secret1").await.unwrap();

        h.account.sign_out().await.unwrap();
        assert!(h.account.session().user().is_none());
        assert!(h.storage.peek(StorageKeys::USER).is_none());
        assert_eq!(h.last_message().as_deref(), Some("Signed out successfully"));

        h.account.login("ana@example.com", "secret1").await.unwrap();
        *h.provider.fail_sign_out.lock() = true;
        h.account.sign_out().await.unwrap_err();
        assert!(h.account.session().user().is_none());
        assert_eq!(h.last_message().as_deref(), Some("Error while signing out"));
    }

    #[tokio::test]
    async fn test_watch_auth_state_forwards_changes() {
        let h = Harness::new().await;
        let task = h.account.watch_auth_state();
        let mut rx = h.account.session().subscribe();

        h.provider.sign_in(UserRecord::new("uid-9", "z@example.com")).unwrap();
        let session = rx
            .wait_for(|s| s.user.is_some())
            .await
            .unwrap()
            .clone();
        assert_eq!(session.user.unwrap().uid, "uid-9");
        assert!(h.storage.peek(StorageKeys::USER).is_some());

        let _ = h.provider.changes.send(None);
        rx.wait_for(|s| s.user.is_none()).await.unwrap();
        // Out-of-band sign-out only touches memory.
        assert!(h.storage.peek(StorageKeys::USER).is_some());

        task.abort();
    }
}
