//! Application context shared by every command.

use crate::notifier::StderrNotifier;
use auth_engine::{Account, FirebaseAuthClient};
use backend_api::BackendClient;
use catalog_fetcher::{CatalogFetcher, FetchState};
use device_storage::{create_storage, KeyValueStore};
use session_store::{Session, SessionStore};
use startsmart_config_and_utils::{Config, Notifier, Paths};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Owns the session and the clients built from configuration.
pub struct App {
    pub paths: Paths,
    pub notifier: Arc<dyn Notifier>,
    pub backend: BackendClient,
    pub session: Arc<SessionStore>,
    pub auth: Arc<FirebaseAuthClient>,
    pub account: Account,
    auth_watch: Option<JoinHandle<()>>,
}

impl App {
    /// Build the clients and resolve the persisted session.
    pub async fn init(config: Config, paths: Paths) -> AppResult<Self> {
        let notifier: Arc<dyn Notifier> = Arc::new(StderrNotifier);
        Self::with_notifier(config, paths, notifier).await
    }

    pub async fn with_notifier(
        config: Config,
        paths: Paths,
        notifier: Arc<dyn Notifier>,
    ) -> AppResult<Self> {
        let storage: Arc<dyn KeyValueStore> = create_storage(&paths);
        let timeout = config.request_timeout();

        let backend = BackendClient::new(config.api_base_url()?.as_str(), timeout)?;
        let auth = Arc::new(
            FirebaseAuthClient::new(
                &config.identity_toolkit_url,
                config.firebase_api_key.clone(),
                timeout,
            )?
            .with_storage(storage.clone()),
        );
        let session = Arc::new(SessionStore::new(storage, notifier.clone()));

        session.load_persisted().await;
        if let Err(e) = auth.restore().await {
            warn!(error = %e, "Failed to restore identity provider state");
        }

        let account = Account::new(auth.clone(), backend.clone(), session.clone(), notifier.clone());
        let auth_watch = Some(account.watch_auth_state());

        let resolved = session.resolved().await;
        info!(authenticated = resolved.is_authenticated(), "Session resolved");

        Ok(Self {
            paths,
            notifier,
            backend,
            session,
            auth,
            account,
            auth_watch,
        })
    }

    pub fn current_session(&self) -> Session {
        self.session.session()
    }

    /// Mount a fetcher and wait for both collections to settle.
    pub async fn load_catalog(&self) -> FetchState {
        let fetcher = CatalogFetcher::mount(Arc::new(self.backend.clone()), self.notifier.clone());
        fetcher.wait_idle().await
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.auth_watch.take() {
            handle.abort();
        }
    }
}
