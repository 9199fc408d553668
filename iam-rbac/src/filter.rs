//! # Query filters
//!
//! Equality predicates over column names. The resolver derives one for every
//! listing; storage applies it. The resolver never fetches rows itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conjunction of `column == value` predicates.
///
/// An empty filter matches every row.
///
/// # Example
///
/// ```
/// use iam_rbac::QueryFilter;
///
/// let filter = QueryFilter::new().with("org_id", "org-1");
/// assert!(filter.matches(|col| (col == "org_id").then(|| "org-1".to_string())));
/// assert!(!filter.matches(|_| None));
/// assert!(QueryFilter::new().matches(|_| None));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    predicates: BTreeMap<String, String>,
}

impl QueryFilter {
    /// Empty filter (all rows).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on a single column.
    pub fn single(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new().with(column, value)
    }

    /// Add a predicate.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(column, value);
        self
    }

    /// Add a predicate in place, replacing any previous value for the column.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.predicates.insert(column.into(), value.into());
    }

    /// Add every predicate of `other`; `other` wins on conflicts.
    pub fn merge(mut self, other: QueryFilter) -> Self {
        self.predicates.extend(other.predicates);
        self
    }

    /// Value required for a column, if constrained.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.predicates.get(column).map(String::as_str)
    }

    /// Whether no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.predicates.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Evaluate against a row, given a column accessor.
    pub fn matches<F>(&self, column: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.predicates
            .iter()
            .all(|(col, expected)| column(col).as_deref() == Some(expected.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides() {
        let filter = QueryFilter::single("a", "1").merge(QueryFilter::single("a", "2").with("b", "3"));
        assert_eq!(filter.get("a"), Some("2"));
        assert_eq!(filter.get("b"), Some("3"));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_all_predicates_must_match() {
        let filter = QueryFilter::single("org_id", "o").with("project_id", "p");
        let row = |col: &str| match col {
            "org_id" => Some("o".to_string()),
            "project_id" => Some("other".to_string()),
            _ => None,
        };
        assert!(!filter.matches(row));
    }
}
