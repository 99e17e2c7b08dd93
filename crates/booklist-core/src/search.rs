//! Relevance search over the catalog
//!
//! Scoring, per book, over every text field:
//! - each query word found in the lowercased field adds its length
//!   (a quarter of it for `description`)
//! - a non-empty field found inside the whole query adds `FIELD_MATCH_BONUS`
//!
//! Results are sorted by score and cut at the first book scoring no more
//! than `0.75 × query length`.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::models::{Book, BookField, Catalog};
use crate::store::Store;

/// Bonus for a field whose whole value appears in the query
pub const FIELD_MATCH_BONUS: f64 = 15.0;

/// Fraction of the query length a score must exceed to be returned
pub const MIN_RELEVANCE_RATIO: f64 = 0.75;

/// Divisor applied to word matches inside the description
const DESCRIPTION_WEIGHT_DIVISOR: f64 = 4.0;

/// Matching book IDs with the time the search took
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub ids: Vec<String>,
    pub elapsed: Duration,
}

/// Score one book against an already-lowercased query
pub fn relevance(book: &Book, query: &str) -> f64 {
    let words: Vec<&str> = query.split_whitespace().collect();

    book.text_fields()
        .map(|(field, value)| {
            let value = value.to_lowercase();
            let divisor = if field == BookField::Description {
                DESCRIPTION_WEIGHT_DIVISOR
            } else {
                1.0
            };

            let word_score: f64 = words
                .iter()
                .filter(|word| value.contains(*word))
                .map(|word| word.chars().count() as f64 / divisor)
                .sum();

            if !value.is_empty() && query.contains(value.as_str()) {
                word_score + FIELD_MATCH_BONUS
            } else {
                word_score
            }
        })
        .sum()
}

/// Rank the catalog against a query, most relevant first
///
/// Ties keep newest-first order.
pub fn search(catalog: &Catalog, query: &str) -> Vec<String> {
    let query = query.to_lowercase();

    let mut scored: Vec<(&str, f64)> = catalog
        .iter()
        .rev()
        .map(|(id, book)| (id, relevance(book, &query)))
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let min_relevance = query.chars().count() as f64 * MIN_RELEVANCE_RATIO;
    scored
        .into_iter()
        .take_while(|(_, score)| *score > min_relevance)
        .map(|(id, _)| id.to_string())
        .collect()
}

impl Store {
    /// Search the catalog under the read lock
    pub fn search(&self, query: &str) -> Vec<String> {
        search(&self.read(), query)
    }

    /// Search and report how long it took
    pub fn search_timed(&self, query: &str) -> SearchResults {
        let start = Instant::now();
        let ids = self.search(query);
        let elapsed = start.elapsed();
        debug!("Search {:?}: {} result(s) in {:?}", query, ids.len(), elapsed);
        SearchResults { ids, elapsed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::covers::PassthroughRenderer;
    use crate::models::BookFields;
    use tempfile::TempDir;

    fn book(fields: &[(BookField, &str)]) -> Book {
        let mut supplied = BookFields::new();
        for (field, value) in fields {
            supplied.set(*field, *value);
        }
        Book::from_fields(&supplied)
    }

    fn two_book_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert(
            "hp",
            book(&[(BookField::Title, "Harry Potter and the Philosophers Stone")]),
        );
        catalog.insert(
            "1984",
            book(&[
                (BookField::Title, "Nineteen Eighty-Four"),
                (BookField::Author, "George Orwell"),
            ]),
        );
        catalog
    }

    #[test]
    fn test_search_by_title_words() {
        assert_eq!(search(&two_book_catalog(), "harry potter"), vec!["hp"]);
    }

    #[test]
    fn test_search_by_author() {
        assert_eq!(search(&two_book_catalog(), "orwell"), vec!["1984"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        assert_eq!(search(&two_book_catalog(), "ORWELL"), vec!["1984"]);
    }

    #[test]
    fn test_search_no_match() {
        assert!(search(&two_book_catalog(), "big chungus").is_empty());
    }

    #[test]
    fn test_relevance_scoring() {
        let dune = book(&[(BookField::Title, "Dune")]);
        // "dune" is in the title (+4) and the title is in the query (+15)
        assert_eq!(relevance(&dune, "dune"), 19.0);
        assert_eq!(relevance(&dune, "chungus"), 0.0);
    }

    #[test]
    fn test_description_matches_weigh_less() {
        let in_title = book(&[(BookField::Title, "Arrakis")]);
        let in_description = book(&[
            (BookField::Title, "Dune"),
            (BookField::Description, "A desert planet called Arrakis"),
        ]);

        assert_eq!(relevance(&in_title, "arrakis"), 7.0 + FIELD_MATCH_BONUS);
        assert_eq!(relevance(&in_description, "arrakis"), 7.0 / 4.0);
    }

    #[test]
    fn test_results_sorted_by_relevance() {
        let mut catalog = Catalog::new();
        catalog.insert("partial", book(&[(BookField::Title, "The Dune Encyclopedia")]));
        catalog.insert("exact", book(&[(BookField::Title, "Dune")]));
        catalog.insert(
            "series",
            book(&[
                (BookField::Title, "Children of Dune"),
                (BookField::Series, "Dune"),
            ]),
        );

        assert_eq!(search(&catalog, "dune"), vec!["series", "exact", "partial"]);
    }

    #[test]
    fn test_ties_favor_newer_books() {
        let mut catalog = Catalog::new();
        catalog.insert("older", book(&[(BookField::Title, "Emma")]));
        catalog.insert("newer", book(&[(BookField::Title, "Emma")]));

        assert_eq!(search(&catalog, "emma"), vec!["newer", "older"]);
    }

    #[test]
    fn test_cutoff_stops_at_first_weak_result() {
        let mut catalog = Catalog::new();
        catalog.insert("weak", book(&[(BookField::Title, "Foundation")]));
        catalog.insert("strong", book(&[(BookField::Title, "Dune")]));

        // "dune foundation" is 15 chars, min relevance 11.25:
        // strong scores 4 + 15, weak scores 10 + 15
        assert_eq!(search(&catalog, "dune foundation"), vec!["weak", "strong"]);
        // "dune messiah" is 12 chars, min 9: only strong qualifies
        assert_eq!(search(&catalog, "dune messiah"), vec!["strong"]);
    }

    #[test]
    fn test_store_search_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open_with_renderer(
            Config::with_data_dir(temp_dir.path()),
            Box::new(PassthroughRenderer),
        );

        let id = store
            .add_book(&BookFields::new().with(BookField::Title, "Dune"))
            .unwrap();

        let expected = Book {
            title: "Dune".to_string(),
            ..Default::default()
        };
        assert_eq!(store.get_book(&id).unwrap(), expected);

        assert_eq!(store.search("dune"), vec![id.clone()]);

        let timed = store.search_timed("dune");
        assert_eq!(timed.ids, vec![id]);
    }
}
