//! REST client for the StartSmart backend.
//!
//! This crate provides:
//! - Wire models for the catalog (`Grade`, `Book`, `Edition`) and user profiles
//! - `BackendClient`, a `reqwest` client for the catalog and profile endpoints
//! - `CatalogSource`, the seam the catalog fetcher retrieves through

mod client;
mod error;
mod models;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use client::{BackendClient, CatalogSource};
pub use error::{CatalogError, CatalogResult, FailureKind};
pub use models::{BackendUser, Book, Edition, Grade, Orientation, ParseEditionError};
