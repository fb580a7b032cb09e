//! Observable fetch state.

use backend_api::{Book, CatalogError, FailureKind, Grade};
use chrono::{DateTime, Utc};
use std::fmt;

/// Which of the two catalog collections a retrieval targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Grades,
    Books,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Grades => f.write_str("grades"),
            Collection::Books => f.write_str("books"),
        }
    }
}

/// Cloneable record of the most recent retrieval failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub collection: Collection,
    pub kind: FailureKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl FetchFailure {
    pub(crate) fn from_error(collection: Collection, error: &CatalogError) -> Self {
        Self {
            collection,
            kind: error.kind(),
            message: error.to_string(),
            at: Utc::now(),
        }
    }
}

/// Snapshot of the catalog as the UI should render it.
///
/// `books` and `grades` are replaced wholesale by a successful retrieval of
/// that collection and left untouched by a failed one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchState {
    /// Books in server order.
    pub books: Vec<Book>,
    /// Grades in server order.
    pub grades: Vec<Grade>,
    /// True while any retrieval is outstanding.
    pub is_loading: bool,
    /// Last failure, if it has not been superseded by a success of the same collection.
    pub error: Option<FetchFailure>,
    /// Completion time of the last successful retrieval.
    pub last_updated: Option<DateTime<Utc>>,
    pending_grades: usize,
    pending_books: usize,
}

impl FetchState {
    pub fn pending(&self, collection: Collection) -> usize {
        match collection {
            Collection::Grades => self.pending_grades,
            Collection::Books => self.pending_books,
        }
    }

    fn pending_mut(&mut self, collection: Collection) -> &mut usize {
        match collection {
            Collection::Grades => &mut self.pending_grades,
            Collection::Books => &mut self.pending_books,
        }
    }

    fn refresh_loading(&mut self) {
        self.is_loading = self.pending_grades + self.pending_books > 0;
    }

    pub(crate) fn begin(&mut self, collection: Collection) {
        *self.pending_mut(collection) += 1;
        self.refresh_loading();
    }

    fn finish(&mut self, collection: Collection) {
        let pending = self.pending_mut(collection);
        *pending = pending.saturating_sub(1);
        self.refresh_loading();
    }

    pub(crate) fn grades_loaded(&mut self, grades: Vec<Grade>) {
        self.grades = grades;
        self.succeeded(Collection::Grades);
    }

    pub(crate) fn books_loaded(&mut self, books: Vec<Book>) {
        self.books = books;
        self.succeeded(Collection::Books);
    }

    fn succeeded(&mut self, collection: Collection) {
        if self
            .error
            .as_ref()
            .is_some_and(|e| e.collection == collection)
        {
            self.error = None;
        }
        self.last_updated = Some(Utc::now());
        self.finish(collection);
    }

    /// A retrieval ended without producing a result (task panicked or was aborted).
    pub(crate) fn abandoned(&mut self, collection: Collection) {
        self.finish(collection);
    }

    pub(crate) fn failed(&mut self, failure: FetchFailure) {
        let collection = failure.collection;
        self.error = Some(failure);
        self.finish(collection);
    }
}
