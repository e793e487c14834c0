// src/aggregation.rs
// Aggregation pipeline: typed stages built with chained methods

use crate::error::{Result, StoreError};
use crate::query::Filter;
use crate::text::TextIndex;
use crate::value_utils::{canonical_json_string, compare_sort_keys, get_nested_value};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Aggregation pipeline
///
/// ```
/// use catalog_core::aggregation::{GroupKey, Pipeline, SortDirection};
/// use catalog_core::query::Filter;
///
/// let page = Pipeline::new()
///     .matching(Filter::eq("category", "Books"))
///     .sort_by("_id", SortDirection::Ascending)
///     .skip(10)
///     .limit(5);
/// assert_eq!(page.stages().len(), 4);
///
/// let facets = Pipeline::new()
///     .group_count(GroupKey::field("category"), "num")
///     .sort_by("_id", SortDirection::Ascending);
/// assert_eq!(facets.to_json()[0]["$group"]["_id"], "$category");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

/// Pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Sort(SortStage),
    Skip(usize),
    Limit(usize),
    GroupCount(GroupCountStage),
}

/// $sort stage - keys are applied in order
#[derive(Debug, Clone, PartialEq)]
pub struct SortStage {
    keys: Vec<(SortKey, SortDirection)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Field(String),
    /// Relevance computed by a preceding `$text` match
    TextScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// $group stage with a single `{$sum: 1}` accumulator
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCountStage {
    key: GroupKey,
    output: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    Field(String), // "$category"
    Null,          // null (all documents in one group)
}

impl GroupKey {
    pub fn field(name: impl Into<String>) -> Self {
        GroupKey::Field(name.into())
    }
}

/// Document travelling through the pipeline, with its text score if any
struct Row {
    doc: Value,
    score: Option<f64>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline { stages: Vec::new() }
    }

    /// Append a `$match` stage
    pub fn matching(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    /// Append a single-key `$sort` stage
    pub fn sort_by(self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort(vec![(SortKey::Field(field.into()), direction)])
    }

    /// Append a multi-key `$sort` stage
    pub fn sort(mut self, keys: Vec<(SortKey, SortDirection)>) -> Self {
        self.stages.push(Stage::Sort(SortStage { keys }));
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.stages.push(Stage::Skip(skip));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.stages.push(Stage::Limit(limit));
        self
    }

    /// Append `{$group: {_id: key, <output>: {$sum: 1}}}`
    pub fn group_count(mut self, key: GroupKey, output: impl Into<String>) -> Self {
        self.stages.push(Stage::GroupCount(GroupCountStage {
            key,
            output: output.into(),
        }));
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Store-native pipeline document (for logs and explain output)
    pub fn to_json(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_json).collect())
    }

    /// Reject pipelines the store would refuse before touching any document
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(StoreError::AggregationError(
                "Pipeline cannot be empty".to_string(),
            ));
        }

        let mut text_matched = false;
        for (position, stage) in self.stages.iter().enumerate() {
            match stage {
                Stage::Match(filter) if filter.is_text() => {
                    if position != 0 {
                        return Err(StoreError::AggregationError(
                            "$match with $text is only allowed as the first pipeline stage"
                                .to_string(),
                        ));
                    }
                    text_matched = true;
                }
                Stage::Sort(sort) => {
                    if sort.keys.is_empty() {
                        return Err(StoreError::AggregationError(
                            "$sort stage must have at least one sort key".to_string(),
                        ));
                    }
                    let wants_score = sort.keys.iter().any(|(k, _)| *k == SortKey::TextScore);
                    if wants_score && !text_matched {
                        return Err(StoreError::AggregationError(
                            "textScore sort requires a preceding $text match".to_string(),
                        ));
                    }
                }
                Stage::Limit(0) => {
                    return Err(StoreError::AggregationError(
                        "$limit must be positive".to_string(),
                    ));
                }
                Stage::GroupCount(group) => {
                    if group.output.is_empty() || group.output == "_id" {
                        return Err(StoreError::AggregationError(format!(
                            "Invalid $group output field: '{}'",
                            group.output
                        )));
                    }
                    // grouped rows no longer carry a text score
                    text_matched = false;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Execute pipeline on documents
    pub fn execute(&self, docs: Vec<Value>, text_index: Option<&TextIndex>) -> Result<Vec<Value>> {
        self.validate()?;

        let mut rows: Vec<Row> = docs
            .into_iter()
            .map(|doc| Row { doc, score: None })
            .collect();

        for stage in &self.stages {
            rows = stage.execute(rows, text_index)?;
        }

        Ok(rows.into_iter().map(|row| row.doc).collect())
    }
}

impl Stage {
    fn execute(&self, rows: Vec<Row>, text_index: Option<&TextIndex>) -> Result<Vec<Row>> {
        match self {
            Stage::Match(filter) => {
                let mut results = Vec::new();
                for row in rows {
                    let outcome = filter.evaluate(&row.doc, text_index)?;
                    if outcome.is_match() {
                        results.push(Row {
                            score: outcome.text_score().or(row.score),
                            doc: row.doc,
                        });
                    }
                }
                Ok(results)
            }
            Stage::Sort(stage) => Ok(stage.execute(rows)),
            Stage::Skip(skip) => Ok(rows.into_iter().skip(*skip).collect()),
            Stage::Limit(limit) => Ok(rows.into_iter().take(*limit).collect()),
            Stage::GroupCount(stage) => Ok(stage.execute(rows)),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Stage::Match(filter) => json!({"$match": filter.to_json()}),
            Stage::Sort(stage) => {
                let mut spec = Map::new();
                for (key, direction) in &stage.keys {
                    let dir = match direction {
                        SortDirection::Ascending => json!(1),
                        SortDirection::Descending => json!(-1),
                    };
                    match key {
                        SortKey::Field(field) => spec.insert(field.clone(), dir),
                        SortKey::TextScore => {
                            spec.insert("score".to_string(), json!({"$meta": "textScore"}))
                        }
                    };
                }
                json!({"$sort": spec})
            }
            Stage::Skip(skip) => json!({"$skip": skip}),
            Stage::Limit(limit) => json!({"$limit": limit}),
            Stage::GroupCount(stage) => {
                let id = match &stage.key {
                    GroupKey::Field(field) => Value::String(format!("${}", field)),
                    GroupKey::Null => Value::Null,
                };
                let mut spec = Map::new();
                spec.insert("_id".to_string(), id);
                spec.insert(stage.output.clone(), json!({"$sum": 1}));
                json!({"$group": spec})
            }
        }
    }
}

impl SortStage {
    fn execute(&self, mut rows: Vec<Row>) -> Vec<Row> {
        // stable sort: ties keep their incoming order
        rows.sort_by(|a, b| {
            for (key, direction) in &self.keys {
                let cmp = match key {
                    SortKey::Field(field) => compare_sort_keys(
                        get_nested_value(&a.doc, field),
                        get_nested_value(&b.doc, field),
                    ),
                    SortKey::TextScore => {
                        let sa = a.score.unwrap_or(0.0);
                        let sb = b.score.unwrap_or(0.0);
                        sa.partial_cmp(&sb).unwrap_or(Ordering::Equal)
                    }
                };
                let cmp = match direction {
                    SortDirection::Ascending => cmp,
                    SortDirection::Descending => cmp.reverse(),
                };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });
        rows
    }
}

impl GroupCountStage {
    fn execute(&self, rows: Vec<Row>) -> Vec<Row> {
        // first-seen order of keys, counts per key
        let mut order: Vec<(String, Value)> = Vec::new();
        let mut counts: HashMap<String, u64> = HashMap::new();

        for row in rows {
            let key_value = match &self.key {
                GroupKey::Null => Value::Null,
                GroupKey::Field(field) => get_nested_value(&row.doc, field)
                    .cloned()
                    .unwrap_or(Value::Null),
            };
            let key = canonical_json_string(&key_value);
            let count = counts.entry(key.clone()).or_insert(0);
            if *count == 0 {
                order.push((key, key_value));
            }
            *count += 1;
        }

        order
            .into_iter()
            .map(|(key, key_value)| {
                let mut result = Map::new();
                result.insert("_id".to_string(), key_value);
                result.insert(
                    self.output.clone(),
                    Value::from(counts.get(&key).copied().unwrap_or(0)),
                );
                Row {
                    doc: Value::Object(result),
                    score: None,
                }
            })
            .collect()
    }
}
