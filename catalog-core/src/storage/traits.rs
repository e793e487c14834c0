// src/storage/traits.rs
//! Document-store client contract used by the catalog service
//!
//! The service never speaks a store's query language directly. It builds a
//! [`Filter`], [`FindOptions`] or [`Pipeline`] and hands it to an
//! implementation of [`DocumentStore`].
//!
//! # Architecture
//!
//! ```text
//! DocumentStore trait (async client surface)
//!   ├── MemoryStore (in-process collections, fault injection for tests)
//!   └── any networked document database adapter
//! ```

use async_trait::async_trait;
use serde_json::Value;

use crate::aggregation::Pipeline;
use crate::document::DocumentId;
use crate::error::Result;
use crate::find_options::FindOptions;
use crate::query::Filter;

/// Outcome of a single-document update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Async document-store client
///
/// Every call is one round trip. Implementations must be safe to share
/// across tasks; conflicting writes are serialized per document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Filtered, sorted, paginated read of a named collection
    ///
    /// Without a sort in `options`, documents come back in natural order.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>>;

    /// Run an aggregation pipeline (matching, grouping, sorting, paging)
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>>;

    /// Single-document lookup by `_id`
    async fn find_by_id(&self, collection: &str, id: &DocumentId) -> Result<Option<Value>>;

    /// Atomically append `value` to the array `field` of document `id`
    ///
    /// A missing document is reported through `matched_count == 0`, not as
    /// an error.
    async fn push_to_array(
        &self,
        collection: &str,
        id: &DocumentId,
        field: &str,
        value: Value,
    ) -> Result<UpdateResult>;
}
