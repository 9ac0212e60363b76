//! CMS module - read-only access to the headless content repository
//!
//! Everything that talks to the content store goes through [`ContentSource`],
//! which is constructed once and injected into the rest of the site. The
//! Prismic HTTP client is the production implementation; [`InMemorySource`]
//! serves fixture documents for offline previews and tests.

mod error;
mod memory;
mod predicate;
mod prismic;

pub use error::{CmsError, Result};
pub use memory::InMemorySource;
pub use predicate::{to_query_param, Predicate};
pub use prismic::{PrismicClient, MASTER_REF_TTL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Largest page size the repository accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// A raw document as returned by the repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type")]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    /// Document fields, already narrowed by the query's projection
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub page: u32,

    #[serde(default)]
    pub results_per_page: u32,

    #[serde(default)]
    pub total_results_size: u32,

    pub total_pages: u32,

    /// Opaque URL of the next page, if any
    #[serde(default)]
    pub next_page: Option<String>,

    pub results: Vec<Document>,
}

/// A filtered, projected and paginated query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    /// Field whitelist in `type.field` form; empty means every field
    pub fetch: Vec<String>,
    pub page_size: u32,
    pub page: u32,
}

impl Query {
    /// Query every document of `doc_type`, first page, page size 20
    pub fn documents_of_type(doc_type: &str) -> Self {
        Self {
            predicates: vec![Predicate::document_type(doc_type)],
            fetch: Vec::new(),
            page_size: 20,
            page: 1,
        }
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Reject pages and sizes the repository would refuse
    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(CmsError::InvalidQuery {
                message: format!("page must be at least 1, got {}", self.page),
            });
        }
        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(CmsError::InvalidQuery {
                message: format!(
                    "page size must be between 1 and {}, got {}",
                    MAX_PAGE_SIZE, self.page_size
                ),
            });
        }
        Ok(())
    }
}

/// Read-only access to a content repository
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a search query and return one page of results
    async fn query(&self, query: &Query) -> Result<SearchResponse>;

    /// Fetch a single document by type and uid; `Ok(None)` when absent
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<Document>>;
}
