// catalog-core/src/config.rs
//! Service configuration, loaded from TOML.
//!
//! ```toml
//! collection = "item"
//! request_timeout_ms = 5000
//! related_items_limit = 4
//! max_page_size = 100
//! search_ordering = "relevance"
//! text_fields = ["title", "slogan", "description"]
//! log_level = "info"
//!
//! [text_weights]
//! title = 10.0
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::logging::LogLevel;
use crate::text::TextIndex;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CATALOG_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// How search results are ordered before paging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrdering {
    /// Item id ascending
    #[default]
    Id,
    /// Text score descending, then item id ascending
    Relevance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub collection: String,
    pub request_timeout_ms: u64,
    pub related_items_limit: usize,
    pub max_page_size: usize,
    pub search_ordering: SearchOrdering,
    pub text_fields: Vec<String>,
    /// Per-field score weight; unlisted fields weigh 1
    pub text_weights: BTreeMap<String, f64>,
    pub log_level: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            collection: "item".to_string(),
            request_timeout_ms: 5000,
            related_items_limit: 4,
            max_page_size: 100,
            search_ordering: SearchOrdering::Id,
            text_fields: vec![
                "title".to_string(),
                "slogan".to_string(),
                "description".to_string(),
            ],
            text_weights: BTreeMap::new(),
            log_level: "warn".to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CatalogConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `$CATALOG_CONFIG` (default `catalog.toml`), or defaults if the file is absent
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| "catalog.toml".to_string());
        Self::load_or_default(path)
    }

    /// Load `path`, falling back to defaults when it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.is_empty() {
            return Err(ConfigError::Invalid("collection must not be empty".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.related_items_limit == 0 {
            return Err(ConfigError::Invalid(
                "related_items_limit must be positive".to_string(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "max_page_size must be positive".to_string(),
            ));
        }
        if self.text_fields.is_empty() {
            return Err(ConfigError::Invalid(
                "text_fields must name at least one field".to_string(),
            ));
        }
        for (field, weight) in &self.text_weights {
            if !self.text_fields.contains(field) {
                return Err(ConfigError::Invalid(format!(
                    "text_weights names '{}', which is not in text_fields",
                    field
                )));
            }
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "text weight for '{}' must be a positive number",
                    field
                )));
            }
        }
        if LogLevel::from_str(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_str(&self.log_level).unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Text index over the configured searchable fields
    pub fn text_index(&self) -> TextIndex {
        self.text_weights.iter().fold(
            TextIndex::new(self.text_fields.iter().cloned()),
            |index, (field, weight)| index.with_weight(field, *weight),
        )
    }
}
