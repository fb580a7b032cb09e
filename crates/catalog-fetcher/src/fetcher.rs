//! Catalog fetcher with independent grade and book retrievals.
//!
//! Each refetch spawns one task per collection. The tasks share nothing but
//! the published [`FetchState`]: a failure in one never cancels or blocks the
//! other, and `is_loading` stays true until both have settled.

use crate::filter::{select_books, ShelfSelection};
use crate::state::{Collection, FetchFailure, FetchState};
use backend_api::{Book, CatalogError, CatalogSource};
use startsmart_config_and_utils::Notifier;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Inner {
    source: Arc<dyn CatalogSource>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<FetchState>,
}

impl Inner {
    fn record_failure(&self, collection: Collection, error: &CatalogError) {
        warn!(
            collection = %collection,
            error = %error,
            transient = error.is_transient(),
            "Catalog retrieval failed"
        );
        self.state
            .send_modify(|state| state.failed(FetchFailure::from_error(collection, error)));
        self.notifier.notify(&format!("Error: {}", error));
    }
}

/// Decrements the pending count if a retrieval task ends without settling.
struct PendingGuard {
    inner: Arc<Inner>,
    collection: Collection,
    settled: bool,
}

impl PendingGuard {
    fn new(inner: Arc<Inner>, collection: Collection) -> Self {
        Self {
            inner,
            collection,
            settled: false,
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.settled {
            warn!(collection = %self.collection, "Catalog retrieval abandoned");
            let collection = self.collection;
            self.inner
                .state
                .send_modify(|state| state.abandoned(collection));
        }
    }
}

async fn load_grades(inner: Arc<Inner>) {
    let mut guard = PendingGuard::new(inner.clone(), Collection::Grades);
    match inner.source.fetch_grades().await {
        Ok(grades) => {
            info!(count = grades.len(), "Grades loaded");
            inner.state.send_modify(|state| state.grades_loaded(grades));
        }
        Err(e) => inner.record_failure(Collection::Grades, &e),
    }
    guard.settled = true;
}

async fn load_books(inner: Arc<Inner>) {
    let mut guard = PendingGuard::new(inner.clone(), Collection::Books);
    match inner.source.fetch_books().await {
        Ok(books) => {
            info!(count = books.len(), "Books loaded");
            inner.state.send_modify(|state| state.books_loaded(books));
        }
        Err(e) => inner.record_failure(Collection::Books, &e),
    }
    guard.settled = true;
}

/// Join handle for one grades + books refetch.
pub struct RefetchHandle {
    grades: JoinHandle<()>,
    books: JoinHandle<()>,
}

impl RefetchHandle {
    /// Wait for both retrievals to settle.
    pub async fn wait(self) {
        let (grades, books) = tokio::join!(self.grades, self.books);
        for (collection, result) in [(Collection::Grades, grades), (Collection::Books, books)] {
            if let Err(e) = result {
                warn!(collection = %collection, error = %e, "Catalog retrieval task failed");
            }
        }
    }
}

/// Keeps the catalog collections and their loading/error state.
#[derive(Clone)]
pub struct CatalogFetcher {
    inner: Arc<Inner>,
}

impl CatalogFetcher {
    /// Create an empty fetcher without issuing any request.
    pub fn new(source: Arc<dyn CatalogSource>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            inner: Arc::new(Inner {
                source,
                notifier,
                state,
            }),
        }
    }

    /// Create a fetcher and immediately start both retrievals.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(source: Arc<dyn CatalogSource>, notifier: Arc<dyn Notifier>) -> Self {
        let fetcher = Self::new(source, notifier);
        fetcher.refetch();
        fetcher
    }

    /// Start both retrievals concurrently.
    ///
    /// Retrievals already in flight are not cancelled or de-duplicated; use
    /// [`CatalogFetcher::try_refetch`] for user-triggered refreshes.
    pub fn refetch(&self) -> RefetchHandle {
        self.inner.state.send_modify(|state| {
            state.begin(Collection::Grades);
            state.begin(Collection::Books);
        });
        debug!("Catalog refetch started");

        RefetchHandle {
            grades: tokio::spawn(load_grades(self.inner.clone())),
            books: tokio::spawn(load_books(self.inner.clone())),
        }
    }

    /// Start a refetch unless one is already outstanding.
    pub fn try_refetch(&self) -> Option<RefetchHandle> {
        if self.is_loading() {
            debug!("Refetch skipped, retrieval already in flight");
            return None;
        }
        Some(self.refetch())
    }

    /// Current snapshot.
    pub fn state(&self) -> FetchState {
        self.inner.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.inner.state.subscribe()
    }

    /// Resolve once no retrieval is outstanding.
    pub async fn wait_idle(&self) -> FetchState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.state(),
        };
        state
    }

    /// Books on the selected shelf from the current snapshot.
    pub fn shelf(&self, selection: Option<&ShelfSelection>) -> Vec<Book> {
        let state = self.inner.state.borrow();
        select_books(&state.books, selection)
            .into_iter()
            .cloned()
            .collect()
    }
}
