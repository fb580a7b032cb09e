//! The session store: who is signed in, mirrored to device storage.
//!
//! `SessionStore` is the single owner of the session. Screens read it through
//! [`SessionStore::session`] or [`SessionStore::subscribe`]; only the four
//! mutating operations change it. Every mutation bumps a generation counter so
//! that a slow `load_persisted` cannot overwrite a newer sign-in or sign-out.
//! Storage writes and their commits run under one async lock, so the memory
//! copy and the persisted record change together.

use crate::session_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionState};
use crate::user::UserRecord;
use crate::SessionResult;
use device_storage::{KeyValueStore, StorageKeys};
use parking_lot::Mutex;
use startsmart_config_and_utils::Notifier;
use std::sync::Arc;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

/// Snapshot of the session published to readers.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub state: SessionState,
    pub user: Option<UserRecord>,
}

impl Session {
    fn initial() -> Self {
        Self {
            state: SessionState::Uninitialized,
            user: None,
        }
    }

    /// The navigation decision: main app when true, authentication flow otherwise.
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }
}

/// Outcome of `set_session` with respect to device storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Written to storage and memory.
    Persisted,
    /// Storage write failed; only the in-memory copy changed.
    MemoryOnly,
}

/// Hook for identity providers that learn about sign-in changes out of band.
pub trait AuthStateListener: Send + Sync {
    fn on_auth_state_changed(&self, user: Option<UserRecord>);
}

/// Callback type for session state change notifications.
///
/// Runs after the store's locks are released, so it may call back into
/// `set_transient`.
pub type SessionStateCallback = Box<dyn Fn(&Session) + Send + Sync>;

struct Machine {
    fsm: SessionMachine,
    generation: u64,
}

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    machine: Mutex<Machine>,
    session: watch::Sender<Session>,
    state_callback: Mutex<Option<Arc<dyn Fn(&Session) + Send + Sync>>>,
    writes: AsyncMutex<()>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (session, _) = watch::channel(Session::initial());
        Self {
            storage,
            notifier,
            machine: Mutex::new(Machine {
                fsm: SessionMachine::new(),
                generation: 0,
            }),
            session,
            state_callback: Mutex::new(None),
            writes: AsyncMutex::new(()),
        }
    }

    /// Set a callback to be notified whenever the session state changes.
    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        *self.state_callback.lock() = Some(Arc::from(callback));
    }

    /// Current snapshot.
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.session.borrow().state
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.session.borrow().user.clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Wait until the session has left `Uninitialized`/`Loading`.
    pub async fn resolved(&self) -> Session {
        let mut rx = self.subscribe();
        let session = match rx.wait_for(|s| s.state.is_resolved()).await {
            Ok(session) => session.clone(),
            Err(_) => self.session(),
        };
        session
    }

    /// Read the persisted record and make it the current session.
    ///
    /// Read or parse failures notify once and resolve the session to none. A
    /// record that cannot be parsed is removed so the next start is clean. If
    /// any mutation lands while the read is in flight, its result is dropped.
    pub async fn load_persisted(&self) -> Option<UserRecord> {
        let (generation, started) = {
            let mut machine = self.machine.lock();
            let started = *machine.fsm.state() == SessionMachineState::Uninitialized;
            if started {
                let _ = machine.fsm.consume(&SessionMachineInput::LoadStarted);
                self.session.send_replace(Session {
                    state: SessionState::Loading,
                    user: None,
                });
            }
            (machine.generation, started)
        };
        if started {
            self.run_callback(&Session {
                state: SessionState::Loading,
                user: None,
            });
        }

        let loaded = match self.storage.get(StorageKeys::USER).await {
            Ok(None) => None,
            Ok(Some(json)) => match UserRecord::from_json(&json) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable session record");
                    self.notifier.notify("Error getting local user");
                    self.remove_unreadable(generation).await;
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to read session record");
                self.notifier.notify("Error getting local user");
                None
            }
        };

        if !self.commit(loaded.clone(), Some(generation)) {
            debug!("Persisted session superseded by a newer update");
            return self.user();
        }

        match &loaded {
            Some(user) => info!(uid = %user.uid, "Restored session"),
            None => info!("No persisted session"),
        }
        loaded
    }

    /// Remove an unreadable record unless a newer update has already replaced
    /// or cleared it.
    async fn remove_unreadable(&self, generation: u64) {
        let _writes = self.writes.lock().await;
        let current = self.machine.lock().generation;
        if current != generation {
            debug!("Keeping session record written by a newer update");
            return;
        }
        if let Err(e) = self.storage.remove(StorageKeys::USER).await {
            warn!(error = %e, "Failed to remove unreadable session record");
        }
    }

    /// Persist `user` and make it the current session.
    ///
    /// A storage failure notifies and leaves the in-memory session updated.
    pub async fn set_session(&self, user: UserRecord) -> SessionResult<Persistence> {
        user.validate()?;

        let _writes = self.writes.lock().await;
        let persistence = match self.write(&user).await {
            Ok(()) => Persistence::Persisted,
            Err(e) => {
                warn!(uid = %user.uid, error = %e, "Failed to persist session");
                self.notifier.notify("Error setting local user");
                Persistence::MemoryOnly
            }
        };

        info!(uid = %user.uid, ?persistence, "Session set");
        self.commit(Some(user), None);
        Ok(persistence)
    }

    async fn write(&self, user: &UserRecord) -> SessionResult<()> {
        let json = user.to_json()?;
        self.storage.set(StorageKeys::USER, &json).await?;
        Ok(())
    }

    /// Remove the persisted record and sign out in memory.
    ///
    /// Memory is cleared even when storage fails. Returns whether storage was
    /// cleared.
    pub async fn clear_session(&self) -> bool {
        let _writes = self.writes.lock().await;
        let removed = match self.storage.remove(StorageKeys::USER).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Failed to remove persisted session");
                self.notifier.notify("Error clearing local user");
                false
            }
        };

        info!("Session cleared");
        self.commit(None, None);
        removed
    }

    /// Replace the in-memory session without touching storage.
    pub fn set_transient(&self, user: Option<UserRecord>) {
        debug!(present = user.is_some(), "Transient session update");
        self.commit(user, None);
    }

    /// Apply a new user under the machine lock.
    ///
    /// With `expected` set, the update is dropped (returning false) if another
    /// commit happened since that generation was observed.
    fn commit(&self, user: Option<UserRecord>, expected: Option<u64>) -> bool {
        let snapshot = {
            let mut machine = self.machine.lock();
            if let Some(expected) = expected {
                if machine.generation != expected {
                    return false;
                }
            }
            machine.generation += 1;

            let input = if user.is_some() {
                SessionMachineInput::UserPresent
            } else {
                SessionMachineInput::UserAbsent
            };
            let old_state = SessionState::from(machine.fsm.state());
            // Every state accepts both resolving inputs.
            let _ = machine.fsm.consume(&input);
            let new_state = SessionState::from(machine.fsm.state());

            if old_state != new_state {
                debug!(
                    old_state = ?old_state,
                    new_state = ?new_state,
                    "Session state transition"
                );
            }
            // Sent under the lock to keep snapshots in commit order.
            let snapshot = Session {
                state: new_state,
                user,
            };
            self.session.send_replace(snapshot.clone());
            snapshot
        };
        self.run_callback(&snapshot);
        true
    }

    fn run_callback(&self, snapshot: &Session) {
        let callback = self.state_callback.lock().clone();
        if let Some(callback) = callback {
            callback(snapshot);
        }
    }
}

impl AuthStateListener for SessionStore {
    fn on_auth_state_changed(&self, user: Option<UserRecord>) {
        self.set_transient(user);
    }
}
