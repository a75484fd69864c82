// src/catalog.rs

//! In-memory filtering of a loaded content catalog.
//!
//! Listings arrive from the database already ordered newest-first; the
//! filter narrows them by free text, subject and class without touching
//! that order. Pure functions, re-runnable on every criterion change.

use serde::Deserialize;

/// Sentinel meaning "do not filter on this criterion".
pub const ALL: &str = "all";

/// Anything that can sit in a filterable catalog listing: notes, previous
/// year papers, lectures and quizzes all expose the same three fields.
pub trait CatalogEntry {
    fn title(&self) -> &str;
    fn subject(&self) -> &str;
    fn class_level(&self) -> &str;
}

/// Query-string criteria for a catalog listing.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    /// Free-text search term.
    pub q: Option<String>,
    pub subject: Option<String>,
    pub class: Option<String>,
}

/// Returns the subsequence of `records` matching every non-default
/// criterion, preserving the original order.
///
/// Text matching is a case-insensitive substring test against title and
/// subject; subject and class are exact matches. Empty or "all" criteria
/// match everything.
pub fn filter<'a, T: CatalogEntry>(
    records: &'a [T],
    search_term: &str,
    subject: &str,
    class_level: &str,
) -> Vec<&'a T> {
    let needle = search_term.trim().to_lowercase();

    records
        .iter()
        .filter(|r| {
            if !needle.is_empty() {
                let in_title = r.title().to_lowercase().contains(&needle);
                let in_subject = r.subject().to_lowercase().contains(&needle);
                if !in_title && !in_subject {
                    return false;
                }
            }
            if subject != ALL && r.subject() != subject {
                return false;
            }
            if class_level != ALL && r.class_level() != class_level {
                return false;
            }
            true
        })
        .collect()
}

/// Applies query-string criteria, treating absent parameters as defaults.
pub fn apply_query<'a, T: CatalogEntry>(records: &'a [T], query: &CatalogQuery) -> Vec<&'a T> {
    filter(
        records,
        query.q.as_deref().unwrap_or(""),
        query.subject.as_deref().unwrap_or(ALL),
        query.class.as_deref().unwrap_or(ALL),
    )
}

/// Distinct subjects of the full (unfiltered) record set, in first-seen
/// order. Fed to the subject filter dropdown.
pub fn distinct_subjects<T: CatalogEntry>(records: &[T]) -> Vec<String> {
    distinct(records, |r| r.subject())
}

/// Distinct class levels, first-seen order.
pub fn distinct_class_levels<T: CatalogEntry>(records: &[T]) -> Vec<String> {
    distinct(records, |r| r.class_level())
}

fn distinct<T, F>(records: &[T], field: F) -> Vec<String>
where
    F: Fn(&T) -> &str,
{
    let mut seen = Vec::new();
    for record in records {
        let value = field(record);
        if !seen.iter().any(|v: &String| v == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
