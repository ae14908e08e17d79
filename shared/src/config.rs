use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::ValidatedUrl;

pub const DEFAULT_REVIEWS_BASE_URL: &str =
    "https://appscript-cors-proxy.misael-delamorena.workers.dev/";
pub const DEFAULT_CATALOG_ENDPOINT: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_CATALOG_COLLECTION: &str = "pokemon";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("page size {0} must be within 1..=100")]
    PageSize(u32),

    #[error("catalog collection cannot be empty")]
    EmptyCollection,
}

/// Where the two remote collections live and how they are paged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub reviews_base_url: String,
    pub catalog_endpoint: String,
    pub catalog_collection: String,
    pub page_size: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            reviews_base_url: DEFAULT_REVIEWS_BASE_URL.into(),
            catalog_endpoint: DEFAULT_CATALOG_ENDPOINT.into(),
            catalog_collection: DEFAULT_CATALOG_COLLECTION.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reviews_url()?;
        self.catalog_url()?;

        if self.catalog_collection.trim().is_empty() {
            return Err(ConfigError::EmptyCollection);
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::PageSize(self.page_size));
        }
        Ok(())
    }

    pub fn reviews_url(&self) -> Result<ValidatedUrl, ConfigError> {
        ValidatedUrl::new(self.reviews_base_url.as_str()).map_err(|e| ConfigError::InvalidUrl {
            field: "reviews_base_url",
            reason: e.to_string(),
        })
    }

    pub fn catalog_url(&self) -> Result<ValidatedUrl, ConfigError> {
        ValidatedUrl::new(self.catalog_endpoint.as_str()).map_err(|e| ConfigError::InvalidUrl {
            field: "catalog_endpoint",
            reason: e.to_string(),
        })
    }
}
