// src/text.rs
//! Full-text predicate: query parsing, per-document matching and scoring.
//!
//! Query syntax follows the document-store `$search` string:
//! - bare words are OR-ed terms: `gray hoodie`
//! - `"quoted phrases"` must all appear when present
//! - `-word` excludes documents containing the word
//!
//! Matching is case-insensitive and works on alphanumeric tokens.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::value_utils::get_nested_value;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
    static ref QUERY_PART_RE: Regex = Regex::new(r#""([^"]*)"|(\S+)"#).unwrap();
}

/// Split text into lowercase alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Fields covered by a collection's text index, with per-field weights
#[derive(Debug, Clone, PartialEq)]
pub struct TextIndex {
    fields: Vec<(String, f64)>,
}

impl TextIndex {
    /// Index over the given fields, each with weight 1
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TextIndex {
            fields: fields.into_iter().map(|f| (f.into(), 1.0)).collect(),
        }
    }

    /// Set the weight of one field (adds the field if missing)
    pub fn with_weight(mut self, field: &str, weight: f64) -> Self {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = weight,
            None => self.fields.push((field.to_string(), weight)),
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parsed `$search` string
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    raw: String,
    terms: Vec<String>,
    phrases: Vec<String>,
    negated: Vec<String>,
}

impl TextQuery {
    /// Parse a search string. Fails when nothing positive is left to match.
    pub fn parse(input: &str) -> Result<Self> {
        let mut terms = Vec::new();
        let mut phrases = Vec::new();
        let mut negated = Vec::new();

        for caps in QUERY_PART_RE.captures_iter(input) {
            if let Some(phrase) = caps.get(1) {
                let phrase = phrase.as_str().trim().to_lowercase();
                if !tokenize(&phrase).is_empty() {
                    push_unique(&mut phrases, phrase);
                }
            } else if let Some(word) = caps.get(2) {
                let word = word.as_str();
                match word.strip_prefix('-') {
                    Some(rest) if !rest.is_empty() => {
                        for token in tokenize(rest) {
                            push_unique(&mut negated, token);
                        }
                    }
                    _ => {
                        for token in tokenize(word) {
                            push_unique(&mut terms, token);
                        }
                    }
                }
            }
        }

        if terms.is_empty() && phrases.is_empty() {
            return Err(StoreError::InvalidQuery(format!(
                "search text '{}' contains no searchable terms",
                input
            )));
        }

        Ok(TextQuery {
            raw: input.to_string(),
            terms,
            phrases,
            negated,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn negated(&self) -> &[String] {
        &self.negated
    }

    /// Relevance score of `doc`, or `None` when it does not match
    pub fn score(&self, doc: &Value, index: &TextIndex) -> Option<f64> {
        let indexed: Vec<(String, Vec<String>, f64)> = index
            .fields
            .iter()
            .filter_map(|(field, weight)| {
                let text = field_text(get_nested_value(doc, field)?)?;
                let lowered = text.to_lowercase();
                let tokens = tokenize(&lowered);
                Some((lowered, tokens, *weight))
            })
            .collect();

        let has_negated = self
            .negated
            .iter()
            .any(|neg| indexed.iter().any(|(_, tokens, _)| tokens.contains(neg)));
        if has_negated {
            return None;
        }

        let mut score = 0.0;

        for phrase in &self.phrases {
            let mut found = false;
            for (text, _, weight) in &indexed {
                let hits = text.matches(phrase.as_str()).count();
                if hits > 0 {
                    found = true;
                    score += weight * hits as f64;
                }
            }
            if !found {
                return None;
            }
        }

        let mut term_hits = 0usize;
        for (_, tokens, weight) in &indexed {
            for term in &self.terms {
                let hits = tokens.iter().filter(|t| *t == term).count();
                term_hits += hits;
                score += weight * hits as f64;
            }
        }

        if self.phrases.is_empty() && term_hits == 0 {
            return None;
        }

        Some(score)
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Indexable text of a field: a string, or the strings inside an array
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> TextIndex {
        TextIndex::new(["title", "slogan", "description"])
    }

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("Gray Hooded-Sweatshirt, 100% cotton!"),
            vec!["gray", "hooded", "sweatshirt", "100", "cotton"]
        );
    }

    #[test]
    fn test_parse_terms_phrases_negations() {
        let q = TextQuery::parse(r#"Mug "coffee cup" -plastic mug"#).unwrap();
        assert_eq!(q.terms(), &["mug".to_string()]);
        assert_eq!(q.phrases(), &["coffee cup".to_string()]);
        assert_eq!(q.negated(), &["plastic".to_string()]);
        assert_eq!(q.raw(), r#"Mug "coffee cup" -plastic mug"#);
    }

    #[test]
    fn test_parse_rejects_empty_queries() {
        assert!(TextQuery::parse("").is_err());
        assert!(TextQuery::parse("   ").is_err());
        assert!(TextQuery::parse("?!").is_err());
        assert!(TextQuery::parse("-only -negated").is_err());
        assert!(TextQuery::parse(r#""""#).is_err());
    }

    #[test]
    fn test_any_term_matches() {
        let doc = json!({"title": "Gray Hooded Sweatshirt", "description": "Cozy"});
        let q = TextQuery::parse("hoodie sweatshirt").unwrap();
        assert!(q.score(&doc, &index()).is_some());

        let q = TextQuery::parse("mug").unwrap();
        assert!(q.score(&doc, &index()).is_none());
    }

    #[test]
    fn test_only_indexed_fields_are_searched() {
        let doc = json!({"title": "Mug", "category": "Kitchen"});
        let q = TextQuery::parse("kitchen").unwrap();
        assert!(q.score(&doc, &index()).is_none());
    }

    #[test]
    fn test_negated_term_excludes() {
        let doc = json!({"title": "Plastic Mug"});
        let q = TextQuery::parse("mug -plastic").unwrap();
        assert!(q.score(&doc, &index()).is_none());
    }

    #[test]
    fn test_phrase_required() {
        let doc = json!({"slogan": "Made of 100% cotton", "title": "Shirt"});
        assert!(TextQuery::parse(r#""100% cotton""#)
            .unwrap()
            .score(&doc, &index())
            .is_some());
        assert!(TextQuery::parse(r#"shirt "pure wool""#)
            .unwrap()
            .score(&doc, &index())
            .is_none());
    }

    #[test]
    fn test_score_counts_hits_and_weights() {
        let doc = json!({"title": "mug", "description": "a mug for every mug lover"});
        let q = TextQuery::parse("mug").unwrap();
        assert_eq!(q.score(&doc, &index()), Some(3.0));

        let weighted = index().with_weight("title", 10.0);
        assert_eq!(q.score(&doc, &weighted), Some(12.0));
    }

    #[test]
    fn test_array_fields_are_indexed() {
        let doc = json!({"title": ["Travel", "Mug"]});
        let q = TextQuery::parse("travel").unwrap();
        assert!(q.score(&doc, &index()).is_some());
    }

    #[test]
    fn test_text_index_fields() {
        let idx = TextIndex::new(["title"]).with_weight("slogan", 2.0);
        assert_eq!(idx.fields().collect::<Vec<_>>(), vec!["title", "slogan"]);
        assert!(!idx.is_empty());
        assert!(TextIndex::new(Vec::<String>::new()).is_empty());
    }
}
