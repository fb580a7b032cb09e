//! Identity Toolkit REST client.
//!
//! Implements [`AuthProvider`] against the `accounts:*` endpoints. The signed-in
//! user and its tokens live in memory and, when a store is attached, under
//! [`StorageKeys::AUTH`] so that a restarted process can pick the user back up.

use crate::provider::{AuthProvider, FederatedCredential};
use crate::{AuthError, AuthFailureKind, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use device_storage::{KeyValueStore, StorageKeys};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use session_store::UserRecord;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

const PASSWORD_PROVIDER: &str = "password";
const GOOGLE_PROVIDER: &str = "google.com";

/// The signed-in user plus the tokens that prove it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthRecord {
    user: UserRecord,
    id_token: String,
    refresh_token: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Response of the sign-in and sign-up endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

impl TokenResponse {
    fn into_record(self, provider_id: &str) -> AuthRecord {
        let mut user = UserRecord::new(self.local_id, self.email.unwrap_or_default());
        user.display_name = self.display_name.filter(|n| !n.is_empty());
        user.photo_url = self.photo_url;
        user.extra
            .insert("providerId".to_string(), Value::String(provider_id.to_string()));

        let expires_at = self
            .expires_in
            .and_then(|secs| secs.parse::<i64>().ok())
            .map(|secs| Utc::now() + Duration::seconds(secs));

        AuthRecord {
            user,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Response of `accounts:update`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Identity Toolkit client.
pub struct FirebaseAuthClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    storage: Option<Arc<dyn KeyValueStore>>,
    current: Mutex<Option<AuthRecord>>,
    changes: broadcast::Sender<Option<UserRecord>>,
}

impl FirebaseAuthClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Identity Toolkit root, e.g. `https://identitytoolkit.googleapis.com/v1`
    /// * `api_key` - Web API key of the project
    /// * `timeout` - Applied to every request
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> AuthResult<Self> {
        Url::parse(base_url)?;
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let (changes, _) = broadcast::channel(16);
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            storage: None,
            current: Mutex::new(None),
            changes,
        })
    }

    /// Keep the signed-in user in `storage` across restarts.
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Reload the user kept by a previous process, if any.
    ///
    /// An unreadable record is dropped and treated as signed out.
    pub async fn restore(&self) -> AuthResult<Option<UserRecord>> {
        let Some(storage) = &self.storage else {
            return Ok(None);
        };

        let Some(json) = storage.get(StorageKeys::AUTH).await? else {
            return Ok(None);
        };

        let record: AuthRecord = match serde_json::from_str(&json) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable auth record");
                storage.remove(StorageKeys::AUTH).await?;
                return Ok(None);
            }
        };

        let user = record.user.clone();
        debug!(uid = %user.uid, expires_at = ?record.expires_at, "Restored auth record");
        *self.current.lock() = Some(record);
        self.announce(Some(user.clone()));
        Ok(Some(user))
    }

    /// Expiry of the current ID token, when known.
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.current.lock().as_ref().and_then(|r| r.expires_at)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}", self.base_url, method)
    }

    async fn call<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> AuthResult<R> {
        let url = self.endpoint(method);
        debug!(url = %url, "Identity Toolkit request");

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let code = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
                _ => format!("HTTP {}", status.as_u16()),
            };
            warn!(
                method,
                status = %status,
                code = %code,
                body_summary = %summarize_response_body(&text),
                "Identity Toolkit request failed"
            );
            return Err(AuthError::Rejected {
                kind: AuthFailureKind::from_code(&code),
                code,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Make `record` the signed-in user.
    async fn establish(&self, record: AuthRecord) -> UserRecord {
        let user = self.store(record).await;
        self.announce(Some(user.clone()));
        user
    }

    /// Replace the current record without announcing a sign-in.
    async fn store(&self, record: AuthRecord) -> UserRecord {
        let user = record.user.clone();
        self.persist(Some(&record)).await;
        *self.current.lock() = Some(record);
        user
    }

    /// Best-effort mirror of the current record to storage.
    async fn persist(&self, record: Option<&AuthRecord>) {
        let Some(storage) = &self.storage else {
            return;
        };

        let result = match record {
            Some(record) => match serde_json::to_string(record) {
                Ok(json) => storage.set(StorageKeys::AUTH, &json).await,
                Err(e) => {
                    warn!(error = %e, "Failed to encode auth record");
                    return;
                }
            },
            None => storage.remove(StorageKeys::AUTH).await.map(|_| ()),
        };

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist auth record");
        }
    }

    fn announce(&self, user: Option<UserRecord>) {
        // No subscribers is not an error.
        let _ = self.changes.send(user);
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuthClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<UserRecord> {
        let response: TokenResponse = self
            .call(
                "signInWithPassword",
                &serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let user = self.establish(response.into_record(PASSWORD_PROVIDER)).await;
        info!(uid = %user.uid, "Signed in with password");
        Ok(user)
    }

    async fn sign_up_with_password(&self, email: &str, password: &str) -> AuthResult<UserRecord> {
        let response: TokenResponse = self
            .call(
                "signUp",
                &serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let user = self.establish(response.into_record(PASSWORD_PROVIDER)).await;
        info!(uid = %user.uid, "Account created");
        Ok(user)
    }

    async fn sign_in_with_credential(
        &self,
        credential: FederatedCredential,
    ) -> AuthResult<UserRecord> {
        let FederatedCredential::Google { id_token } = credential;
        if id_token.trim().is_empty() {
            return Err(AuthError::Cancelled);
        }

        let post_body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("id_token", &id_token)
            .append_pair("providerId", GOOGLE_PROVIDER)
            .finish();

        let response: TokenResponse = self
            .call(
                "signInWithIdp",
                &serde_json::json!({
                    "postBody": post_body,
                    "requestUri": "http://localhost",
                    "returnIdpCredential": true,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let user = self.establish(response.into_record(GOOGLE_PROVIDER)).await;
        info!(uid = %user.uid, "Signed in with Google");
        Ok(user)
    }

    async fn send_password_reset(&self, email: &str) -> AuthResult<()> {
        let _: Value = self
            .call(
                "sendOobCode",
                &serde_json::json!({
                    "requestType": "PASSWORD_RESET",
                    "email": email,
                }),
            )
            .await?;
        info!("Password reset email requested");
        Ok(())
    }

    async fn update_profile(&self, display_name: &str) -> AuthResult<UserRecord> {
        let current = self.current.lock().clone();
        let Some(mut record) = current else {
            return Err(AuthError::NotSignedIn);
        };

        let response: UpdateResponse = self
            .call(
                "update",
                &serde_json::json!({
                    "idToken": record.id_token,
                    "displayName": display_name,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        record.user.display_name = Some(
            response
                .display_name
                .unwrap_or_else(|| display_name.to_string()),
        );
        if let Some(id_token) = response.id_token {
            record.id_token = id_token;
        }
        if let Some(refresh_token) = response.refresh_token {
            record.refresh_token = refresh_token;
        }

        let user = self.store(record).await;
        info!(uid = %user.uid, "Profile updated");
        Ok(user)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        let previous = self.current.lock().take();
        self.persist(None).await;
        self.announce(None);
        if let Some(record) = previous {
            info!(uid = %record.user.uid, "Signed out");
        }
        Ok(())
    }

    fn current_user(&self) -> Option<UserRecord> {
        self.current.lock().as_ref().map(|r| r.user.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<Option<UserRecord>> {
        self.changes.subscribe()
    }
}
