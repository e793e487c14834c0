//! Value utility functions shared across modules
//!
//! Nested field access, value comparison for sort stages, and canonical
//! rendering used as a grouping key.

use serde_json::Value;
use std::cmp::Ordering;

/// Get nested value from JSON with dot notation support
///
/// Supports:
/// - Simple fields: "category"
/// - Nested objects: "dimensions.width"
/// - Array indexing: "reviews.0.name"
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use catalog_core::value_utils::get_nested_value;
///
/// let doc = json!({"reviews": [{"name": "Ann"}]});
/// assert_eq!(get_nested_value(&doc, "reviews.0.name"), Some(&json!("Ann")));
/// ```
pub fn get_nested_value<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if !path.contains('.') {
        return doc.get(path);
    }

    let mut value = doc;
    for part in path.split('.') {
        match value {
            Value::Object(map) => value = map.get(part)?,
            Value::Array(arr) => {
                if let Ok(index) = part.parse::<usize>() {
                    value = arr.get(index)?;
                } else {
                    return None;
                }
            }
            _ => return None,
        }
    }
    Some(value)
}

/// Compare two JSON values of the same kind
///
/// Returns `None` for incompatible types (e.g. string vs number).
/// Integers are compared exactly; mixed integer/float falls back to f64.
///
/// ```
/// use serde_json::json;
/// use std::cmp::Ordering;
/// use catalog_core::value_utils::compare_values;
///
/// assert_eq!(compare_values(&json!(10), &json!(5)), Some(Ordering::Greater));
/// assert_eq!(compare_values(&json!("a"), &json!(1)), None);
/// ```
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(n1), Value::Number(n2)) => {
            if let (Some(i1), Some(i2)) = (n1.as_i64(), n2.as_i64()) {
                return Some(i1.cmp(&i2));
            }
            let f1 = n1.as_f64()?;
            let f2 = n2.as_f64()?;
            f1.partial_cmp(&f2)
        }
        (Value::String(s1), Value::String(s2)) => Some(s1.cmp(s2)),
        (Value::Bool(b1), Value::Bool(b2)) => Some(b1.cmp(b2)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Total order over optional values, used by sort stages
///
/// Missing < null < numbers < strings < objects < arrays < booleans.
/// Values of the same kind compare with [`compare_values`]; objects and
/// arrays compare by their canonical rendering so the order stays total.
pub fn compare_sort_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(av), Some(bv)) => {
            let by_type = type_priority(av).cmp(&type_priority(bv));
            if by_type != Ordering::Equal {
                return by_type;
            }
            compare_values(av, bv).unwrap_or_else(|| {
                canonical_json_string(av).cmp(&canonical_json_string(bv))
            })
        }
    }
}

fn type_priority(val: &Value) -> u8 {
    match val {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Canonical string form of a JSON value with object keys sorted
///
/// Two logically equal values always render identically, so the result can
/// be used as a map key when grouping.
///
/// ```
/// use serde_json::json;
/// use catalog_core::value_utils::canonical_json_string;
///
/// let v1 = json!({"a": 1, "b": 2});
/// let v2 = json!({"b": 2, "a": 1});
/// assert_eq!(canonical_json_string(&v1), canonical_json_string(&v2));
/// ```
pub fn canonical_json_string(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));

            let inner: String = pairs
                .iter()
                .map(|(k, v)| {
                    format!("{}:{}", Value::String((*k).clone()), canonical_json_string(v))
                })
                .collect::<Vec<_>>()
                .join(",");

            format!("{{{}}}", inner)
        }
        Value::Array(arr) => {
            let inner: String = arr
                .iter()
                .map(canonical_json_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("[{}]", inner)
        }
        _ => value.to_string(),
    }
}
