// storage/memory_storage.rs
//! In-process document store
//!
//! Implements [`DocumentStore`] over collections held in memory. Used to
//! seed the CLI from a JSON file and as the backend of the test suite.
//!
//! # Architecture
//!
//! ```text
//! MemoryStore (DocumentStore implementation)
//!      ↓
//! RwLock<HashMap<String, CollectionData>> (collection -> documents in natural order)
//! ```
//!
//! Every async call first goes through a simulated round trip, where tests
//! can inject latency or take the store offline.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::aggregation::{Pipeline, Stage};
use crate::document::{Document, DocumentId};
use crate::error::{Result, StoreError};
use crate::find_options::{apply_limit_skip, apply_sort, FindOptions};
use crate::query::Filter;
use crate::storage::{DocumentStore, UpdateResult};
use crate::text::TextIndex;

/// One collection: documents in insertion order plus an `_id` position map
#[derive(Debug, Default)]
struct CollectionData {
    docs: Vec<Document>,
    positions: HashMap<DocumentId, usize>,
    text_index: Option<TextIndex>,
}

impl CollectionData {
    fn insert(&mut self, doc: Document) -> Result<DocumentId> {
        if self.positions.contains_key(&doc.id) {
            return Err(StoreError::DuplicateKey(doc.id));
        }
        let id = doc.id.clone();
        self.positions.insert(id.clone(), self.docs.len());
        self.docs.push(doc);
        Ok(id)
    }

    fn values(&self) -> Vec<Value> {
        self.docs.iter().map(Document::to_value).collect()
    }
}

/// Injected failure modes
#[derive(Debug, Clone, Default)]
struct Faults {
    latency: Option<Duration>,
    offline: bool,
}

/// In-memory document store
///
/// ```ignore
/// let store = MemoryStore::new();
/// store.create_text_index("item", TextIndex::new(["title", "slogan", "description"]))?;
/// store.insert_one("item", json!({"_id": 1, "title": "Gray Hooded Sweatshirt"}))?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, CollectionData>>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== COLLECTION MANAGEMENT ==========

    /// Create an empty collection (no-op if it exists)
    pub fn create_collection(&self, name: &str) {
        self.collections.write().entry(name.to_string()).or_default();
    }

    /// Collection names, sorted
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Define (or replace) the text index of a collection
    pub fn create_text_index(&self, collection: &str, index: TextIndex) -> Result<()> {
        if index.is_empty() {
            return Err(StoreError::InvalidQuery(
                "text index must cover at least one field".to_string(),
            ));
        }
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .text_index = Some(index);
        Ok(())
    }

    /// Insert one document; `_id` must be present and unique
    pub fn insert_one(&self, collection: &str, doc: Value) -> Result<DocumentId> {
        let doc = Document::from_value(doc)?;
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(doc)
    }

    /// Insert many documents, all or nothing
    pub fn insert_many(&self, collection: &str, docs: Vec<Value>) -> Result<Vec<DocumentId>> {
        let parsed = docs
            .into_iter()
            .map(Document::from_value)
            .collect::<Result<Vec<_>>>()?;

        let mut collections = self.collections.write();
        let data = collections.entry(collection.to_string()).or_default();

        let mut seen = std::collections::HashSet::new();
        for doc in &parsed {
            if data.positions.contains_key(&doc.id) || !seen.insert(doc.id.clone()) {
                return Err(StoreError::DuplicateKey(doc.id.clone()));
            }
        }

        parsed.into_iter().map(|doc| data.insert(doc)).collect()
    }

    /// All documents of a collection in natural order
    pub fn export(&self, collection: &str) -> Result<Vec<Value>> {
        self.collections
            .read()
            .get(collection)
            .map(CollectionData::values)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))
    }

    /// Number of documents in a collection (0 if it does not exist)
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|data| data.docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    // ========== FAULT INJECTION ==========

    /// Delay every subsequent call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults.lock().latency = latency;
    }

    /// Fail every subsequent call with `StoreError::Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.faults.lock().offline = offline;
    }

    async fn round_trip(&self) -> Result<()> {
        let faults = self.faults.lock().clone();
        if let Some(latency) = faults.latency {
            tokio::time::sleep(latency).await;
        }
        if faults.offline {
            return Err(StoreError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    // ========== SYNCHRONOUS QUERY HELPERS ==========
    // Locks are only taken here, never across an await point.

    fn find_now(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>> {
        let collections = self.collections.read();
        let data = collections.get(collection);

        // a missing collection has no text index either
        let has_index = data.map_or(false, |d| d.text_index.is_some());
        if filter.is_text() && !has_index {
            return Err(StoreError::InvalidQuery(
                "text index required for $text query".to_string(),
            ));
        }
        let Some(data) = data else {
            return Ok(Vec::new());
        };

        let mut docs = Vec::new();
        for doc in data.values() {
            if filter.evaluate(&doc, data.text_index.as_ref())?.is_match() {
                docs.push(doc);
            }
        }
        drop(collections);

        if let Some(ref sort) = options.sort {
            apply_sort(&mut docs, sort);
        }
        Ok(apply_limit_skip(docs, options.limit, options.skip))
    }

    fn aggregate_now(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>> {
        pipeline.validate()?;

        let (docs, text_index) = {
            let collections = self.collections.read();
            match collections.get(collection) {
                Some(data) => (data.values(), data.text_index.clone()),
                None => (Vec::new(), None),
            }
        };

        let starts_with_text = matches!(
            pipeline.stages().first(),
            Some(Stage::Match(filter)) if filter.is_text()
        );
        if starts_with_text && text_index.is_none() {
            return Err(StoreError::InvalidQuery(
                "text index required for $text query".to_string(),
            ));
        }

        pipeline.execute(docs, text_index.as_ref())
    }

    fn find_by_id_now(&self, collection: &str, id: &DocumentId) -> Option<Value> {
        let collections = self.collections.read();
        let data = collections.get(collection)?;
        let position = *data.positions.get(id)?;
        data.docs.get(position).map(Document::to_value)
    }

    fn push_now(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        value: Value,
    ) -> Result<UpdateResult> {
        let mut collections = self.collections.write();
        let Some(data) = collections.get_mut(collection) else {
            return Ok(UpdateResult::default());
        };
        let Some(&position) = data.positions.get(id) else {
            return Ok(UpdateResult::default());
        };
        let doc = data.docs.get_mut(position).ok_or_else(|| {
            StoreError::InvalidDocument(format!("catalog entry for _id {} is stale", id))
        })?;
        doc.push(field, value)?;
        Ok(UpdateResult {
            matched_count: 1,
            modified_count: 1,
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>> {
        self.round_trip().await?;
        self.find_now(collection, filter, options)
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>> {
        self.round_trip().await?;
        self.aggregate_now(collection, pipeline)
    }

    async fn find_by_id(&self, collection: &str, id: &DocumentId) -> Result<Option<Value>> {
        self.round_trip().await?;
        Ok(self.find_by_id_now(collection, id))
    }

    async fn push_to_array(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        value: Value,
    ) -> Result<UpdateResult> {
        self.round_trip().await?;
        self.push_now(collection, id, field, value)
    }
}
