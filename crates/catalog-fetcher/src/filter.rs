//! Grade + edition shelf selection.

use backend_api::{Book, Edition};

/// The shelf a browsing screen shows: one grade within one edition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShelfSelection {
    pub grade: String,
    pub edition: Edition,
}

impl ShelfSelection {
    pub fn new(grade: impl Into<String>, edition: Edition) -> Self {
        Self {
            grade: grade.into(),
            edition,
        }
    }

    /// Exact string match on both grade and edition identifiers.
    pub fn matches(&self, book: &Book) -> bool {
        book.grade == self.grade && book.edition == self.edition.as_str()
    }
}

/// Books on the selected shelf, in their original relative order.
///
/// An absent selection or an empty list yields an empty result.
pub fn select_books<'a>(books: &'a [Book], selection: Option<&ShelfSelection>) -> Vec<&'a Book> {
    let Some(selection) = selection else {
        return Vec::new();
    };
    books.iter().filter(|book| selection.matches(book)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GRADES: [&str; 3] = ["Grade 3", "Grade 4", "Grade 5"];
    const EDITIONS: [&str; 4] = ["annual edition", "term edition", "semester edition", "other"];

    fn book_strategy() -> impl Strategy<Value = Book> {
        (0usize..GRADES.len(), 0usize..EDITIONS.len(), "[a-z]{1,8}").prop_map(
            |(g, e, title)| Book::new(title, GRADES[g], EDITIONS[e]),
        )
    }

    fn edition_strategy() -> impl Strategy<Value = Edition> {
        prop_oneof![
            Just(Edition::Annual),
            Just(Edition::Term),
            Just(Edition::Semester)
        ]
    }

    #[test]
    fn test_selects_matching_grade_and_edition() {
        let books = vec![
            Book::new("A", "Grade 3", "annual edition"),
            Book::new("B", "Grade 3", "term edition"),
        ];
        let selection = ShelfSelection::new("Grade 3", Edition::Annual);

        let selected = select_books(&books, Some(&selection));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].title, "A");
    }

    #[test]
    fn test_empty_inputs() {
        let selection = ShelfSelection::new("Grade 3", Edition::Annual);
        assert!(select_books(&[], Some(&selection)).is_empty());

        let books = vec![Book::new("A", "Grade 3", "annual edition")];
        assert!(select_books(&books, None).is_empty());
    }

    #[test]
    fn test_no_match_is_empty() {
        let books = vec![
            Book::new("A", "Grade 4", "annual edition"),
            Book::new("B", "Grade 3", "semester edition"),
        ];
        let selection = ShelfSelection::new("Grade 3", Edition::Term);
        assert!(select_books(&books, Some(&selection)).is_empty());
    }

    #[test]
    fn test_grade_match_is_exact() {
        let books = vec![
            Book::new("A", "grade 3", "annual edition"),
            Book::new("B", "Grade 3 ", "annual edition"),
            Book::new("C", "Grade 3", "Annual Edition"),
        ];
        let selection = ShelfSelection::new("Grade 3", Edition::Annual);
        assert!(select_books(&books, Some(&selection)).is_empty());
    }

    proptest! {
        #[test]
        fn prop_selection_is_ordered_matching_subsequence(
            books in prop::collection::vec(book_strategy(), 0..40),
            grade in 0usize..GRADES.len(),
            edition in edition_strategy(),
        ) {
            let selection = ShelfSelection::new(GRADES[grade], edition);
            let selected = select_books(&books, Some(&selection));

            let expected: Vec<&Book> = books
                .iter()
                .filter(|b| b.grade == GRADES[grade] && b.edition == edition.as_str())
                .collect();
            prop_assert_eq!(&selected, &expected);

            // Every selected element is a distinct position of the input, in order.
            let mut cursor = 0;
            for book in &selected {
                let offset = books[cursor..]
                    .iter()
                    .position(|b| std::ptr::eq(b, *book));
                prop_assert!(offset.is_some());
                cursor += offset.unwrap_or(0) + 1;
            }
        }
    }
}
