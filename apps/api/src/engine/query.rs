//! Query Pipeline: client-side search, category filter and sort over a fetched list.
//!
//! Always applied in that order. Pure and deterministic; the sort is stable.

use serde::{Deserialize, Serialize};

use crate::models::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryState {
    pub search_term: String,
    /// Empty means no filter.
    pub category_filter: String,
    pub sort_field: String,
    pub sort_direction: SortDirection,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            category_filter: String::new(),
            sort_field: "created".into(),
            sort_direction: SortDirection::Desc,
        }
    }
}

/// Fields the category filter compares against.
const CATEGORY_FIELDS: &[&str] = &["category", "domain"];

pub fn apply<'a>(items: &'a [Record], query: &QueryState) -> Vec<&'a Record> {
    let needle = query.search_term.to_lowercase();

    let mut result: Vec<&Record> = items
        .iter()
        .filter(|item| matches_search(item, &needle))
        .filter(|item| matches_category(item, &query.category_filter))
        .collect();

    // `sort_by` is stable: equal keys keep their relative order.
    result.sort_by(|a, b| {
        let ord = a.text(&query.sort_field).cmp(&b.text(&query.sort_field));
        match query.sort_direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    result
}

fn matches_search(item: &Record, needle: &str) -> bool {
    needle.is_empty()
        || item
            .searchable_values()
            .any(|value| value.to_lowercase().contains(needle))
}

fn matches_category(item: &Record, filter: &str) -> bool {
    filter.is_empty()
        || CATEGORY_FIELDS
            .iter()
            .any(|field| item.text(field) == filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> Vec<Record> {
        vec![
            Record::new("1").with("title", "Zeta").with("category", "X"),
            Record::new("2").with("title", "Alpha").with("category", "Y"),
        ]
    }

    fn ids(items: &[&Record]) -> Vec<String> {
        items.iter().map(|r| r.id.clone()).collect()
    }

    fn sorted_by(field: &str, direction: SortDirection) -> QueryState {
        QueryState {
            sort_field: field.into(),
            sort_direction: direction,
            ..QueryState::default()
        }
    }

    #[test]
    fn test_sort_by_title_ascending() {
        let items = fixture();
        let shown = apply(&items, &sorted_by("title", SortDirection::Asc));
        let titles: Vec<String> = shown.iter().map(|r| r.text("title")).collect();
        assert_eq!(titles, ["Alpha", "Zeta"]);
    }

    #[test]
    fn test_sort_descending_reverses() {
        let items = fixture();
        let shown = apply(&items, &sorted_by("title", SortDirection::Desc));
        assert_eq!(ids(&shown), ["1", "2"]);
    }

    #[test]
    fn test_category_filter_keeps_matching_only() {
        let items = fixture();
        let query = QueryState {
            category_filter: "Y".into(),
            ..QueryState::default()
        };
        assert_eq!(ids(&apply(&items, &query)), ["2"]);
    }

    #[test]
    fn test_category_filter_matches_domain_field() {
        let items = vec![
            Record::new("c1").with("domain", "Cloud"),
            Record::new("c2").with("domain", "AI"),
        ];
        let query = QueryState {
            category_filter: "AI".into(),
            ..QueryState::default()
        };
        assert_eq!(ids(&apply(&items, &query)), ["c2"]);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let items = vec![
            Record::new("1").with("title", "Rust Axum").with("notes", ""),
            Record::new("2").with("title", "Go").with("notes", "learned AXUM basics"),
            Record::new("3").with("title", "Python"),
        ];
        let query = QueryState {
            search_term: "axum".into(),
            sort_field: "id".into(),
            sort_direction: SortDirection::Asc,
            ..QueryState::default()
        };
        assert_eq!(ids(&apply(&items, &query)), ["1", "2"]);
    }

    #[test]
    fn test_search_matches_non_string_values() {
        let items = vec![
            Record::new("1").with("salary", 120000),
            Record::new("2").with("salary", 90000),
        ];
        let query = QueryState {
            search_term: "120".into(),
            ..QueryState::default()
        };
        assert_eq!(ids(&apply(&items, &query)), ["1"]);
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let items = fixture();
        let query = QueryState {
            sort_field: String::new(),
            ..QueryState::default()
        };
        assert_eq!(ids(&apply(&items, &query)), ["1", "2"]);
    }

    #[test]
    fn test_missing_sort_field_sorts_as_empty() {
        let items = vec![
            Record::new("1").with("title", "B"),
            Record::new("2"),
            Record::new("3").with("title", "A"),
        ];
        let shown = apply(&items, &sorted_by("title", SortDirection::Asc));
        assert_eq!(ids(&shown), ["2", "3", "1"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let items = vec![
            Record::new("a").with("status", "Applied"),
            Record::new("b").with("status", "Offer"),
            Record::new("c").with("status", "Applied"),
            Record::new("d").with("status", "Applied"),
        ];
        let asc = apply(&items, &sorted_by("status", SortDirection::Asc));
        assert_eq!(ids(&asc), ["a", "c", "d", "b"]);
        let desc = apply(&items, &sorted_by("status", SortDirection::Desc));
        assert_eq!(ids(&desc), ["b", "a", "c", "d"]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let items = vec![
            Record::new("1").with("title", "Kafka").with("category", "Backend"),
            Record::new("2").with("title", "Kubernetes").with("category", "DevOps"),
            Record::new("3").with("title", "Keras").with("category", "Backend"),
            Record::new("4").with("title", "React").with("category", "Backend"),
        ];
        let query = QueryState {
            search_term: "k".into(),
            category_filter: "Backend".into(),
            sort_field: "title".into(),
            sort_direction: SortDirection::Asc,
        };
        let once: Vec<Record> = apply(&items, &query).into_iter().cloned().collect();
        let twice: Vec<Record> = apply(&once, &query).into_iter().cloned().collect();
        assert_eq!(once, twice);
        assert_eq!(
            once.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            ["1", "3", "4"]
        );
    }

    #[test]
    fn test_search_is_monotonic() {
        let items = vec![
            Record::new("1").with("company", "Google"),
            Record::new("2").with("company", "Goldman"),
            Record::new("3").with("company", "Gojek"),
        ];
        let mut previous = usize::MAX;
        for term in ["", "g", "go", "goo", "goog", "googlex"] {
            let query = QueryState {
                search_term: term.into(),
                ..QueryState::default()
            };
            let count = apply(&items, &query).len();
            assert!(count <= previous, "{term} grew the result set");
            previous = count;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn test_search_applies_before_category() {
        let items = vec![
            Record::new("1").with("title", "Docker").with("category", "DevOps"),
            Record::new("2").with("title", "Docker Compose").with("category", "Backend"),
        ];
        let query = QueryState {
            search_term: "docker".into(),
            category_filter: "Backend".into(),
            ..QueryState::default()
        };
        assert_eq!(ids(&apply(&items, &query)), ["2"]);
    }

    #[test]
    fn test_default_sorts_newest_first() {
        let mut old = Record::new("old");
        old.created = "2024-01-01 00:00:00.000Z".into();
        let mut new = Record::new("new");
        new.created = "2025-06-01 00:00:00.000Z".into();
        let items = vec![old, new];
        assert_eq!(ids(&apply(&items, &QueryState::default())), ["new", "old"]);
    }

    #[test]
    fn test_direction_toggle() {
        assert_eq!(SortDirection::Asc.toggled(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.toggled(), SortDirection::Asc);
    }
}
