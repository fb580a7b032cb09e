//! Remote catalog retrieval and client-side book selection.
//!
//! [`CatalogFetcher`] keeps the grade and book collections fresh with two
//! independent retrievals and publishes a [`FetchState`] snapshot after every
//! change. [`select_books`] narrows the book list down to one grade shelf.

mod fetcher;
mod filter;
mod state;

pub use fetcher::{CatalogFetcher, RefetchHandle};
pub use filter::{select_books, ShelfSelection};
pub use state::{Collection, FetchFailure, FetchState};
