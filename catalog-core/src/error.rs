// catalog-core/src/error.rs
//! Error types for the store layer and the catalog service.
//!
//! The store reports [`StoreError`]; the service translates it into the
//! caller-facing [`CatalogError`] taxonomy. Every failure reaches the caller.

use std::time::Duration;

use thiserror::Error;

use crate::document::DocumentId;

/// Errors reported by a [`DocumentStore`](crate::storage::DocumentStore)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Duplicate key: _id {0} already exists")]
    DuplicateKey(DocumentId),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Aggregation error: {0}")]
    AggregationError(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure outcomes of [`CatalogQueryService`](crate::service::CatalogQueryService)
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Lookup or update targeted an item id that does not exist
    #[error("Item not found: {0}")]
    NotFound(DocumentId),

    /// Paging or search arguments were rejected before reaching the store
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store round trip exceeded the configured deadline
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// Any other failure reported by the store
    #[error("Store error: {0}")]
    StoreError(StoreError),
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => CatalogError::StoreUnavailable(msg),
            other => CatalogError::StoreError(other),
        }
    }
}

/// Result type alias for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
