//! Authentication for the StartSmart client.
//!
//! This crate provides:
//! - `AuthProvider`, the seam to the external identity provider
//! - `FirebaseAuthClient`, an Identity Toolkit REST implementation
//! - `Account`, the sign-in, sign-up and profile workflows that tie the
//!   provider, the backend profile API and the session store together

mod account;
mod error;
mod firebase;
mod provider;

pub use account::Account;
pub use error::{AuthError, AuthFailureKind, AuthResult};
pub use firebase::FirebaseAuthClient;
pub use provider::{AuthProvider, FederatedCredential};
