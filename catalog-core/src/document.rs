// src/document.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};

/// Document key
///
/// Untagged so it appears as a plain value inside documents: `{"_id": 2}`.
/// Ordering puts every integer id before every string id, then compares
/// within the variant. This is the sort key used for pagination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum DocumentId {
    Int(i64),
    String(String),
}

impl DocumentId {
    /// Read an id from a raw `_id` value
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(DocumentId::Int).ok_or_else(|| {
                StoreError::InvalidDocument(format!("_id must be an integer, got {}", n))
            }),
            Value::String(s) => Ok(DocumentId::String(s.clone())),
            other => Err(StoreError::InvalidDocument(format!(
                "_id must be an integer or string, got {}",
                other
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DocumentId::Int(i) => Value::from(*i),
            DocumentId::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Int(i) => write!(f, "{}", i),
            DocumentId::String(s) => write!(f, "{}", s),
        }
    }
}

/// Integer-looking input becomes `Int`, anything else a string id.
impl FromStr for DocumentId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(i) => DocumentId::Int(i),
            Err(_) => DocumentId::String(s.to_string()),
        })
    }
}

/// Stored document: key plus every other top-level field
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: DocumentId, fields: Map<String, Value>) -> Self {
        Document { id, fields }
    }

    /// Split a JSON object into key and fields. `_id` is required.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(StoreError::InvalidDocument(
                "Document must be an object".to_string(),
            ));
        };

        let raw_id = fields.shift_remove("_id").ok_or_else(|| {
            StoreError::InvalidDocument("Document must have an _id field".to_string())
        })?;
        let id = DocumentId::from_value(&raw_id)?;

        Ok(Document { id, fields })
    }

    /// Full JSON form, `_id` first
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert("_id".to_string(), self.id.to_value());
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Append one value to a top-level array field, creating the array if missing.
    ///
    /// Existing elements are never touched. Fails if the field holds a non-array.
    pub fn push(&mut self, field: &str, value: Value) -> Result<()> {
        match self.fields.get_mut(field) {
            Some(Value::Array(arr)) => {
                arr.push(value);
                Ok(())
            }
            Some(_) => Err(StoreError::InvalidQuery(format!(
                "$push: field '{}' is not an array",
                field
            ))),
            None => {
                self.fields
                    .insert(field.to_string(), Value::Array(vec![value]));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sid(id: &str) -> DocumentId {
        DocumentId::String(id.to_string())
    }

    #[test]
    fn test_from_value_splits_id() {
        let doc = Document::from_value(json!({"_id": 1, "title": "Mug"})).unwrap();
        assert_eq!(doc.id, DocumentId::Int(1));
        assert_eq!(doc.fields.get("title"), Some(&json!("Mug")));
        assert!(doc.fields.get("_id").is_none());
    }

    #[test]
    fn test_from_value_requires_object_and_id() {
        assert!(Document::from_value(json!([1, 2])).is_err());
        assert!(Document::from_value(json!({"title": "Mug"})).is_err());
        assert!(Document::from_value(json!({"_id": 1.5})).is_err());
        assert!(Document::from_value(json!({"_id": null})).is_err());
    }

    #[test]
    fn test_to_value_roundtrips_fields() {
        let original = json!({"_id": "abc", "price": 12.5, "tags": ["a"]});
        let doc = Document::from_value(original.clone()).unwrap();
        assert_eq!(doc.to_value(), original);
    }

    #[test]
    fn test_push_appends_in_order() {
        let mut doc = Document::from_value(json!({"_id": 1, "reviews": [{"n": 1}]})).unwrap();
        doc.push("reviews", json!({"n": 2})).unwrap();
        doc.push("reviews", json!({"n": 3})).unwrap();
        assert_eq!(
            doc.fields.get("reviews"),
            Some(&json!([{"n": 1}, {"n": 2}, {"n": 3}]))
        );
    }

    #[test]
    fn test_push_creates_missing_array() {
        let mut doc = Document::from_value(json!({"_id": 1})).unwrap();
        doc.push("reviews", json!("first")).unwrap();
        assert_eq!(doc.fields.get("reviews"), Some(&json!(["first"])));
    }

    #[test]
    fn test_push_rejects_non_array() {
        let mut doc = Document::from_value(json!({"_id": 1, "reviews": "oops"})).unwrap();
        let err = doc.push("reviews", json!(1)).unwrap_err();
        assert!(err.to_string().contains("is not an array"));
        assert_eq!(doc.fields.get("reviews"), Some(&json!("oops")));
    }

    #[test]
    fn test_id_ordering_ints_before_strings() {
        let mut ids = vec![sid("b"), DocumentId::Int(10), sid("a"), DocumentId::Int(2)];
        ids.sort();
        assert_eq!(
            ids,
            vec![DocumentId::Int(2), DocumentId::Int(10), sid("a"), sid("b")]
        );
    }

    #[test]
    fn test_id_from_str() {
        assert_eq!("42".parse::<DocumentId>().unwrap(), DocumentId::Int(42));
        assert_eq!(
            "sku-42".parse::<DocumentId>().unwrap(),
            DocumentId::String("sku-42".to_string())
        );
    }

    #[test]
    fn test_id_serializes_untagged() {
        assert_eq!(serde_json::to_value(DocumentId::Int(3)).unwrap(), json!(3));
        assert_eq!(serde_json::from_value::<DocumentId>(json!("x")).unwrap(), sid("x"));
    }
}
