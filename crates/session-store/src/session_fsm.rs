//! Session lifecycle state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Uninitialized  │ (initial, process start)
//! └────────┬────────┘
//!          │ LoadStarted
//!          ▼
//! ┌─────────────────┐
//! │     Loading     │
//! └────────┬────────┘
//!          │ UserPresent / UserAbsent
//!          ▼
//! ┌─────────────────┐   UserAbsent    ┌─────────────────┐
//! │  Authenticated  │ ──────────────► │ Unauthenticated │
//! │                 │ ◄────────────── │                 │
//! └─────────────────┘   UserPresent   └─────────────────┘
//! ```
//!
//! There is no terminal state. `Loading` is only re-entered by a new process.
//! An auth-state notification may also arrive before the persisted record has
//! been read, so `Uninitialized` accepts the resolving inputs directly.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Uninitialized)

    Uninitialized => {
        LoadStarted => Loading,
        UserPresent => Authenticated,
        UserAbsent => Unauthenticated
    },
    Loading => {
        UserPresent => Authenticated,
        UserAbsent => Unauthenticated
    },
    Authenticated => {
        UserPresent => Authenticated,
        UserAbsent => Unauthenticated
    },
    Unauthenticated => {
        UserPresent => Authenticated,
        UserAbsent => Unauthenticated
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session lifecycle state for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing has been read yet.
    Uninitialized,
    /// The persisted record is being read.
    Loading,
    /// A user is signed in.
    Authenticated,
    /// Nobody is signed in.
    Unauthenticated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// True once the root navigation decision can be made.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            SessionState::Authenticated | SessionState::Unauthenticated
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Uninitialized => SessionState::Uninitialized,
            SessionMachineState::Loading => SessionState::Loading,
            SessionMachineState::Authenticated => SessionState::Authenticated,
            SessionMachineState::Unauthenticated => SessionState::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_uninitialized() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::Uninitialized);
    }

    #[test]
    fn test_startup_with_persisted_user() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoadStarted).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Loading);

        machine.consume(&SessionMachineInput::UserPresent).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_startup_without_persisted_user() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoadStarted).unwrap();
        machine.consume(&SessionMachineInput::UserAbsent).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn test_sign_in_and_out_cycle() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::LoadStarted).unwrap();
        machine.consume(&SessionMachineInput::UserAbsent).unwrap();

        machine.consume(&SessionMachineInput::UserPresent).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);

        // Profile updates keep the user signed in.
        machine.consume(&SessionMachineInput::UserPresent).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);

        machine.consume(&SessionMachineInput::UserAbsent).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn test_loading_is_not_reentered() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::LoadStarted).unwrap();

        assert!(machine.consume(&SessionMachineInput::LoadStarted).is_err());

        machine.consume(&SessionMachineInput::UserPresent).unwrap();
        assert!(machine.consume(&SessionMachineInput::LoadStarted).is_err());
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_notification_before_load_resolves_directly() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::UserPresent).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_session_state_conversion() {
        assert_eq!(
            SessionState::from(&SessionMachineState::Uninitialized),
            SessionState::Uninitialized
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::Loading),
            SessionState::Loading
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::Authenticated),
            SessionState::Authenticated
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::Unauthenticated),
            SessionState::Unauthenticated
        );
    }

    #[test]
    fn test_session_state_predicates() {
        assert!(SessionState::Authenticated.is_authenticated());
        assert!(!SessionState::Loading.is_authenticated());

        assert!(!SessionState::Uninitialized.is_resolved());
        assert!(!SessionState::Loading.is_resolved());
        assert!(SessionState::Authenticated.is_resolved());
        assert!(SessionState::Unauthenticated.is_resolved());
    }

    #[test]
    fn test_session_state_serialization() {
        assert_eq!(
            serde_json::to_string(&SessionState::Unauthenticated).unwrap(),
            r#""unauthenticated""#
        );
    }
}
