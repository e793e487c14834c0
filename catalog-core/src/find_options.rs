// catalog-core/src/find_options.rs
// Find query options: sort, limit, skip

use crate::aggregation::SortDirection;
use crate::value_utils::{compare_sort_keys, get_nested_value};
use serde_json::Value;

/// Options for plain `find` reads
///
/// With no sort, documents come back in the collection's natural order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort: [(field, direction)]
    pub sort: Option<Vec<(String, SortDirection)>>,

    /// Limit: maximum number of documents to return
    pub limit: Option<usize>,

    /// Skip: number of documents to skip (for pagination)
    pub skip: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort(mut self, sort: Vec<(String, SortDirection)>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Apply sort to documents
/// Supports dot notation for nested fields (e.g., "reviews.0.stars")
pub fn apply_sort(docs: &mut [Value], sort: &[(String, SortDirection)]) {
    if sort.is_empty() {
        return;
    }

    docs.sort_by(|a, b| {
        for (field, direction) in sort {
            let cmp = compare_sort_keys(get_nested_value(a, field), get_nested_value(b, field));

            if cmp != std::cmp::Ordering::Equal {
                return match direction {
                    SortDirection::Ascending => cmp,
                    SortDirection::Descending => cmp.reverse(),
                };
            }
        }
        std::cmp::Ordering::Equal
    });
}

/// Apply limit and skip to documents
pub fn apply_limit_skip(docs: Vec<Value>, limit: Option<usize>, skip: Option<usize>) -> Vec<Value> {
    let skipped = docs.into_iter().skip(skip.unwrap_or(0));
    match limit {
        Some(limit_count) => skipped.take(limit_count).collect(),
        None => skipped.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbered(n: i64) -> Vec<Value> {
        (1..=n).map(|i| json!({"n": i})).collect()
    }

    #[test]
    fn test_builder() {
        let options = FindOptions::new().with_limit(4).with_skip(8);
        assert_eq!(options.limit, Some(4));
        assert_eq!(options.skip, Some(8));
        assert!(options.sort.is_none());
    }

    #[test]
    fn test_sort_single_field() {
        let mut docs = vec![json!({"price": 30}), json!({"price": 25}), json!({"price": 35})];
        apply_sort(&mut docs, &[("price".to_string(), SortDirection::Ascending)]);
        assert_eq!(docs[0]["price"], 25);
        assert_eq!(docs[2]["price"], 35);
    }

    #[test]
    fn test_sort_multi_field() {
        let mut docs = vec![
            json!({"category": "Books", "title": "B"}),
            json!({"category": "Apparel", "title": "A"}),
            json!({"category": "Books", "title": "C"}),
        ];
        apply_sort(
            &mut docs,
            &[
                ("category".to_string(), SortDirection::Ascending),
                ("title".to_string(), SortDirection::Descending),
            ],
        );
        assert_eq!(docs[0]["title"], "A");
        assert_eq!(docs[1]["title"], "C");
        assert_eq!(docs[2]["title"], "B");
    }

    #[test]
    fn test_sort_missing_field_first() {
        let mut docs = vec![json!({"stars": 4}), json!({}), json!({"stars": 2})];
        apply_sort(&mut docs, &[("stars".to_string(), SortDirection::Ascending)]);
        assert!(docs[0].get("stars").is_none());
        assert_eq!(docs[1]["stars"], 2);
    }

    #[test]
    fn test_limit() {
        let result = apply_limit_skip(numbered(5), Some(3), None);
        assert_eq!(result.len(), 3);
        assert_eq!(result[2]["n"], 3);
    }

    #[test]
    fn test_skip() {
        let result = apply_limit_skip(numbered(5), None, Some(2));
        assert_eq!(result.len(), 3);
        assert_eq!(result[0]["n"], 3);
    }

    #[test]
    fn test_limit_skip() {
        let result = apply_limit_skip(numbered(5), Some(2), Some(1));
        assert_eq!(result, vec![json!({"n": 2}), json!({"n": 3})]);
    }

    #[test]
    fn test_skip_beyond_length() {
        assert!(apply_limit_skip(numbered(2), None, Some(10)).is_empty());
    }
}
