// catalog-core/src/lib.rs
// Pure Rust API - no front-end dependencies

pub mod aggregation;
pub mod config;
pub mod document;
pub mod error;
pub mod find_options;
pub mod logging;
pub mod model;
pub mod query;
pub mod service;
pub mod storage;
pub mod text;
pub mod value_utils;

// Public exports
pub use aggregation::{GroupKey, Pipeline, SortDirection, SortKey, Stage};
pub use config::{CatalogConfig, ConfigError, SearchOrdering};
pub use document::{Document, DocumentId};
pub use error::{CatalogError, CatalogResult, Result, StoreError};
pub use find_options::FindOptions;
pub use logging::{init_logging, LogLevel};
pub use model::{CategoryFacet, Item, Review, ALL_CATEGORIES};
pub use query::Filter;
pub use service::CatalogQueryService;
pub use storage::{DocumentStore, MemoryStore, UpdateResult};
pub use text::{TextIndex, TextQuery};
