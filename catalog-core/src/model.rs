// catalog-core/src/model.rs
//! Catalog records as stored in the `item` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::DocumentId;

/// Category name that stands for "every category"
pub const ALL_CATEGORIES: &str = "All";

/// One catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slogan: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub stars: f64,
    #[serde(default)]
    pub img_url: String,
    /// Oldest first
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// Customer review embedded in its item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub name: String,
    pub comment: String,
    pub stars: f64,
    /// Assigned by the service when the review is appended
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
}

/// Derived (category, count) summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFacet {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "num")]
    pub count: u64,
}

impl CategoryFacet {
    pub fn new(id: impl Into<String>, count: u64) -> Self {
        CategoryFacet {
            id: id.into(),
            count,
        }
    }

    pub fn is_all(&self) -> bool {
        self.id == ALL_CATEGORIES
    }
}
