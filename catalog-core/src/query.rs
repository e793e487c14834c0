// src/query.rs
//! Match predicates used by `find` and the `$match` stage.
//!
//! The catalog needs three shapes only: everything, one field equal to a
//! value, and the full-text predicate. Each renders to the store-native
//! filter document via [`Filter::to_json`].

use serde_json::{json, Value};

use crate::error::{Result, StoreError};
use crate::text::{TextIndex, TextQuery};
use crate::value_utils::get_nested_value;

/// Document filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `{}`: matches every document
    All,
    /// `{field: value}`
    Eq { field: String, value: Value },
    /// `{$text: {$search: ...}}`
    Text(TextQuery),
}

/// Outcome of evaluating a filter against one document
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome {
    NoMatch,
    Match,
    /// Text predicate matched with a relevance score
    Scored(f64),
}

impl MatchOutcome {
    pub fn is_match(self) -> bool {
        !matches!(self, MatchOutcome::NoMatch)
    }

    pub fn text_score(self) -> Option<f64> {
        match self {
            MatchOutcome::Scored(score) => Some(score),
            _ => None,
        }
    }
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn text(query: TextQuery) -> Self {
        Filter::Text(query)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Filter::Text(_))
    }

    /// Evaluate against a full document (including `_id`)
    ///
    /// A text filter needs the collection's text index; evaluating one
    /// without an index is a query error, as in the store it models.
    pub fn evaluate(&self, doc: &Value, text_index: Option<&TextIndex>) -> Result<MatchOutcome> {
        match self {
            Filter::All => Ok(MatchOutcome::Match),
            Filter::Eq { field, value } => {
                let matched = match get_nested_value(doc, field) {
                    Some(Value::Array(items)) if !value.is_array() => items.contains(value),
                    Some(found) => found == value,
                    None => value.is_null(),
                };
                Ok(if matched {
                    MatchOutcome::Match
                } else {
                    MatchOutcome::NoMatch
                })
            }
            Filter::Text(query) => {
                let index = text_index.filter(|idx| !idx.is_empty()).ok_or_else(|| {
                    StoreError::InvalidQuery("text index required for $text query".to_string())
                })?;
                Ok(match query.score(doc, index) {
                    Some(score) => MatchOutcome::Scored(score),
                    None => MatchOutcome::NoMatch,
                })
            }
        }
    }

    /// Store-native filter document
    pub fn to_json(&self) -> Value {
        match self {
            Filter::All => json!({}),
            Filter::Eq { field, value } => {
                let mut map = serde_json::Map::new();
                map.insert(field.clone(), value.clone());
                Value::Object(map)
            }
            Filter::Text(query) => json!({"$text": {"$search": query.raw()}}),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
