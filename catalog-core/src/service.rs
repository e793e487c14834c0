// catalog-core/src/service.rs
//! Catalog query service: category facets, paged listing and search, item
//! lookup and review appends over a [`DocumentStore`].
//!
//! Every operation is one store round trip bounded by
//! [`CatalogConfig::request_timeout`]. Failures are returned, never replaced
//! by an empty value.

use std::future::Future;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::aggregation::{GroupKey, Pipeline, SortDirection, SortKey};
use crate::config::{CatalogConfig, SearchOrdering};
use crate::document::DocumentId;
use crate::error::{CatalogError, CatalogResult, StoreError};
use crate::find_options::FindOptions;
use crate::model::{CategoryFacet, Item, Review, ALL_CATEGORIES};
use crate::query::Filter;
use crate::storage::DocumentStore;
use crate::text::TextQuery;

const REVIEWS_FIELD: &str = "reviews";
const CATEGORY_FIELD: &str = "category";
const ID_FIELD: &str = "_id";
const ITEM_COUNT_OUTPUT: &str = "num";
const SEARCH_COUNT_OUTPUT: &str = "total";

/// Read/aggregate operations over the item collection plus the review append
///
/// Holds no per-request state; clones share the store handle.
pub struct CatalogQueryService<S: DocumentStore> {
    store: Arc<S>,
    config: CatalogConfig,
}

impl<S: DocumentStore> Clone for CatalogQueryService<S> {
    fn clone(&self) -> Self {
        CatalogQueryService {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: DocumentStore> CatalogQueryService<S> {
    pub fn new(store: Arc<S>, config: CatalogConfig) -> Self {
        CatalogQueryService { store, config }
    }

    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, CatalogConfig::default())
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ========== CATEGORIES ==========

    /// Item count per category, name ascending, followed by the `"All"` total
    pub async fn list_categories(&self) -> CatalogResult<Vec<CategoryFacet>> {
        let pipeline = Pipeline::new()
            .group_count(GroupKey::field(CATEGORY_FIELD), ITEM_COUNT_OUTPUT)
            .sort_by(ID_FIELD, SortDirection::Ascending);

        let docs = self.aggregate("list_categories", &pipeline).await?;
        let mut facets: Vec<CategoryFacet> = decode_all(docs)?;

        let total = facets.iter().map(|facet| facet.count).sum();
        facets.push(CategoryFacet::new(ALL_CATEGORIES, total));
        Ok(facets)
    }

    // ========== LISTING ==========

    /// Page `page` (zero-based) of a category, id ascending
    pub async fn list_items(
        &self,
        category: &str,
        page: usize,
        page_size: usize,
    ) -> CatalogResult<Vec<Item>> {
        let skip = self.page_offset(page, page_size)?;

        let mut pipeline = Pipeline::new();
        if let Some(filter) = category_filter(category) {
            pipeline = pipeline.matching(filter);
        }
        let pipeline = pipeline
            .sort_by(ID_FIELD, SortDirection::Ascending)
            .skip(skip)
            .limit(page_size);

        let docs = self.aggregate("list_items", &pipeline).await?;
        decode_all(docs)
    }

    /// Number of items in a category (all items for `"All"`)
    pub async fn count_items(&self, category: &str) -> CatalogResult<u64> {
        let mut pipeline = Pipeline::new();
        if let Some(filter) = category_filter(category) {
            pipeline = pipeline.matching(filter);
        }
        let pipeline = pipeline.group_count(GroupKey::Null, ITEM_COUNT_OUTPUT);

        let docs = self.aggregate("count_items", &pipeline).await?;
        read_count(&docs, ITEM_COUNT_OUTPUT)
    }

    // ========== SEARCH ==========

    /// Page of items matching the text query
    pub async fn search_items(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> CatalogResult<Vec<Item>> {
        let skip = self.page_offset(page, page_size)?;
        let text = parse_search(query)?;

        let mut keys = Vec::with_capacity(2);
        if self.config.search_ordering == SearchOrdering::Relevance {
            keys.push((SortKey::TextScore, SortDirection::Descending));
        }
        keys.push((SortKey::Field(ID_FIELD.to_string()), SortDirection::Ascending));

        let pipeline = Pipeline::new()
            .matching(Filter::text(text))
            .sort(keys)
            .skip(skip)
            .limit(page_size);

        let docs = self.aggregate("search_items", &pipeline).await?;
        decode_all(docs)
    }

    /// Number of items matching the text query
    pub async fn count_search_items(&self, query: &str) -> CatalogResult<u64> {
        let text = parse_search(query)?;
        let pipeline = Pipeline::new()
            .matching(Filter::text(text))
            .group_count(GroupKey::Null, SEARCH_COUNT_OUTPUT);

        let docs = self.aggregate("count_search_items", &pipeline).await?;
        read_count(&docs, SEARCH_COUNT_OUTPUT)
    }

    // ========== SINGLE ITEMS ==========

    pub async fn get_item(&self, id: &DocumentId) -> CatalogResult<Item> {
        debug!(
            operation = "get_item",
            collection = %self.config.collection,
            id = %id,
            "find_by_id"
        );
        let found = self
            .bounded("get_item", self.store.find_by_id(&self.config.collection, id))
            .await?;

        match found {
            Some(doc) => decode(doc),
            None => Err(CatalogError::NotFound(id.clone())),
        }
    }

    /// Up to `related_items_limit` items in natural order
    ///
    /// Not related to any particular item: this is an unfiltered sample.
    pub async fn get_related_items(&self) -> CatalogResult<Vec<Item>> {
        let options = FindOptions::new().with_limit(self.config.related_items_limit);
        debug!(
            operation = "get_related_items",
            collection = %self.config.collection,
            limit = self.config.related_items_limit,
            "find"
        );
        let docs = self
            .bounded(
                "get_related_items",
                self.store
                    .find(&self.config.collection, &Filter::All, &options),
            )
            .await?;
        decode_all(docs)
    }

    // ========== MUTATION ==========

    /// Append a review dated now to the item's `reviews`
    ///
    /// The append is a single atomic store update. Not safe to retry blindly:
    /// a retried call after a timeout may store the review twice.
    pub async fn add_review(
        &self,
        item_id: &DocumentId,
        comment: &str,
        name: &str,
        stars: f64,
    ) -> CatalogResult<Review> {
        if !stars.is_finite() {
            return Err(CatalogError::InvalidArgument(format!(
                "stars must be a finite number, got {}",
                stars
            )));
        }

        let review = Review {
            name: name.to_string(),
            comment: comment.to_string(),
            stars,
            date: Utc::now().trunc_subsecs(3),
        };
        let value = serde_json::to_value(&review).map_err(StoreError::from)?;

        debug!(
            operation = "add_review",
            collection = %self.config.collection,
            id = %item_id,
            "$push"
        );
        let result = self
            .bounded(
                "add_review",
                self.store
                    .push_to_array(&self.config.collection, item_id, REVIEWS_FIELD, value),
            )
            .await?;

        if result.matched_count == 0 {
            return Err(CatalogError::NotFound(item_id.clone()));
        }

        info!(id = %item_id, reviewer = %review.name, "Review appended");
        Ok(review)
    }

    // ========== INTERNALS ==========

    fn page_offset(&self, page: usize, page_size: usize) -> CatalogResult<usize> {
        if page_size == 0 {
            return Err(CatalogError::InvalidArgument(
                "page_size must be at least 1".to_string(),
            ));
        }
        if page_size > self.config.max_page_size {
            return Err(CatalogError::InvalidArgument(format!(
                "page_size {} exceeds the maximum of {}",
                page_size, self.config.max_page_size
            )));
        }
        page.checked_mul(page_size).ok_or_else(|| {
            CatalogError::InvalidArgument(format!(
                "page {} with page_size {} is out of range",
                page, page_size
            ))
        })
    }

    async fn aggregate(
        &self,
        operation: &'static str,
        pipeline: &Pipeline,
    ) -> CatalogResult<Vec<Value>> {
        debug!(
            operation,
            collection = %self.config.collection,
            pipeline = %pipeline.to_json(),
            "aggregate"
        );
        self.bounded(
            operation,
            self.store.aggregate(&self.config.collection, pipeline),
        )
        .await
    }

    /// Run one store call under the request deadline
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> CatalogResult<T>
    where
        F: Future<Output = crate::error::Result<T>>,
    {
        let deadline = self.config.request_timeout();
        match tokio::time::timeout(deadline, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(operation, error = %err, "Store call failed");
                Err(err.into())
            }
            Err(_) => {
                warn!(operation, timeout_ms = deadline.as_millis() as u64, "Store call timed out");
                Err(CatalogError::Timeout(deadline))
            }
        }
    }
}

fn category_filter(category: &str) -> Option<Filter> {
    if category == ALL_CATEGORIES {
        None
    } else {
        Some(Filter::eq(CATEGORY_FIELD, category))
    }
}

fn parse_search(query: &str) -> CatalogResult<TextQuery> {
    TextQuery::parse(query).map_err(|err| match err {
        StoreError::InvalidQuery(msg) => CatalogError::InvalidArgument(msg),
        other => CatalogError::StoreError(other),
    })
}

/// Count from a `$group: {_id: null}` result; no group means no matches
fn read_count(docs: &[Value], output: &str) -> CatalogResult<u64> {
    match docs.first() {
        None => Ok(0),
        Some(group) => group.get(output).and_then(Value::as_u64).ok_or_else(|| {
            CatalogError::StoreError(StoreError::Serialization(format!(
                "count result has no numeric '{}' field: {}",
                output, group
            )))
        }),
    }
}

fn decode<T: DeserializeOwned>(doc: Value) -> CatalogResult<T> {
    serde_json::from_value(doc).map_err(|err| CatalogError::StoreError(err.into()))
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Value>) -> CatalogResult<Vec<T>> {
    docs.into_iter().map(decode).collect()
}
