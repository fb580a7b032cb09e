//! Local user session for the StartSmart client.
//!
//! This crate provides:
//! - `SessionStore`, the single owner of "who is signed in", mirrored to
//!   on-device storage
//! - An explicit FSM for the session lifecycle (uninitialized, loading,
//!   authenticated, unauthenticated)
//! - `AuthStateListener`, the hook an identity provider calls when the
//!   signed-in user changes out of band

mod error;
mod session_fsm;
mod store;
mod user;

pub use error::{SessionError, SessionResult};
pub use session_fsm::session_machine;
pub use session_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionState};
pub use store::{AuthStateListener, Persistence, Session, SessionStateCallback, SessionStore};
pub use user::UserRecord;
