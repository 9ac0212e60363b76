//! In-memory content source backed by a fixed set of documents
//!
//! Used for offline previews (`cms.fixtures` in `_config.yml`) and as the
//! substitute repository in tests. It honours the same predicates, field
//! projection and pagination as the real repository.

use async_trait::async_trait;
use std::fs;
use std::path::Path;

use super::{CmsError, ContentSource, Document, Predicate, Query, Result, SearchResponse};

#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: Vec<Document>,
}

impl InMemorySource {
    /// Documents are kept in the given order, which is the result order
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Load a JSON array of documents
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fixture_error = |message: String| CmsError::Fixtures {
            path: path.display().to_string(),
            message,
        };

        let content = fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
        let documents: Vec<Document> =
            serde_json::from_str(&content).map_err(|e| fixture_error(e.to_string()))?;

        tracing::debug!("Loaded {} fixture documents from {:?}", documents.len(), path);
        Ok(Self::new(documents))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn matches(document: &Document, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::At { path, value } => {
                if path == "document.type" {
                    return &document.doc_type == value;
                }
                if path == "document.id" {
                    return &document.id == value;
                }
                // my.<type>.uid or my.<type>.<field>
                let mut parts = path.splitn(3, '.');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some("my"), Some(doc_type), Some("uid")) => {
                        document.doc_type == doc_type
                            && document.uid.as_deref() == Some(value.as_str())
                    }
                    (Some("my"), Some(doc_type), Some(field)) => {
                        document.doc_type == doc_type
                            && document.data.get(field).and_then(|v| v.as_str())
                                == Some(value.as_str())
                    }
                    _ => false,
                }
            }
        }
    }

    /// Keep only whitelisted `type.field` entries of the data block
    fn project(document: &Document, fetch: &[String]) -> Document {
        if fetch.is_empty() {
            return document.clone();
        }

        let mut projected = document.clone();
        if let serde_json::Value::Object(fields) = &document.data {
            let kept = fields
                .iter()
                .filter(|(name, _)| {
                    fetch.iter().any(|f| {
                        f.split_once('.')
                            .map(|(doc_type, field)| {
                                doc_type == document.doc_type && field == name.as_str()
                            })
                            .unwrap_or(false)
                    })
                })
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            projected.data = serde_json::Value::Object(kept);
        }
        projected
    }
}

#[async_trait]
impl ContentSource for InMemorySource {
    async fn query(&self, query: &Query) -> Result<SearchResponse> {
        query.validate()?;

        let matching: Vec<&Document> = self
            .documents
            .iter()
            .filter(|doc| query.predicates.iter().all(|p| Self::matches(doc, p)))
            .collect();

        let page_size = query.page_size as usize;
        let total = matching.len();
        let total_pages = total.div_ceil(page_size) as u32;

        let results: Vec<Document> = matching
            .into_iter()
            .skip((query.page as usize - 1) * page_size)
            .take(page_size)
            .map(|doc| Self::project(doc, &query.fetch))
            .collect();

        let next_page = (query.page < total_pages).then(|| {
            format!(
                "memory://documents/search?page={}&pageSize={}",
                query.page + 1,
                query.page_size
            )
        });

        Ok(SearchResponse {
            page: query.page,
            results_per_page: query.page_size,
            total_results_size: total as u32,
            total_pages,
            next_page,
            results,
        })
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<Document>> {
        let predicate = Predicate::uid(doc_type, uid);
        Ok(self
            .documents
            .iter()
            .find(|doc| Self::matches(doc, &predicate))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(n: usize, doc_type: &str) -> Document {
        Document {
            id: format!("id-{n}"),
            uid: Some(format!("post-{n}")),
            doc_type: doc_type.to_string(),
            first_publication_date: Some("2021-03-15T19:25:28+0000".to_string()),
            data: json!({
                "title": format!("Post {n}"),
                "subtitle": "Sub",
                "author": "Ana",
                "content": [{"heading": "H", "body": [{"text": "t"}]}]
            }),
        }
    }

    fn source(count: usize) -> InMemorySource {
        let mut docs: Vec<Document> = (1..=count).map(|n| doc(n, "posts")).collect();
        docs.push(doc(99, "pages"));
        InMemorySource::new(docs)
    }

    #[tokio::test]
    async fn test_paginates_matching_documents() {
        let source = source(23);
        let query = Query::documents_of_type("posts").page_size(10).page(3);
        let response = source.query(&query).await.unwrap();

        assert_eq!(response.total_results_size, 23);
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.page, 3);
        assert!(response.next_page.is_none());
        let uids: Vec<_> = response
            .results
            .iter()
            .map(|d| d.uid.clone().unwrap())
            .collect();
        assert_eq!(uids, vec!["post-21", "post-22", "post-23"]);
    }

    #[tokio::test]
    async fn test_next_page_present_until_last() {
        let source = source(23);
        let response = source
            .query(&Query::documents_of_type("posts").page_size(10))
            .await
            .unwrap();
        assert_eq!(response.results.len(), 10);
        assert!(response.next_page.is_some());
    }

    #[tokio::test]
    async fn test_projection_keeps_only_whitelisted_fields() {
        let source = source(1);
        let query = Query::documents_of_type("posts").fetch(["posts.title", "posts.author"]);
        let response = source.query(&query).await.unwrap();

        let data = &response.results[0].data;
        assert_eq!(data["title"], "Post 1");
        assert_eq!(data["author"], "Ana");
        assert!(data.get("subtitle").is_none());
        assert!(data.get("content").is_none());
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let source = source(3);
        let response = source
            .query(&Query::documents_of_type("posts").page_size(10).page(5))
            .await
            .unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.total_pages, 1);
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let source = source(3);
        let found = source.get_by_uid("posts", "post-2").await.unwrap();
        assert_eq!(found.unwrap().id, "id-2");

        assert!(source.get_by_uid("posts", "post-99").await.unwrap().is_none());
        assert!(source.get_by_uid("pages", "post-99").await.unwrap().is_some());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        std::fs::write(&path, serde_json::to_string(&vec![doc(1, "posts")]).unwrap()).unwrap();

        let source = InMemorySource::from_file(&path).unwrap();
        assert_eq!(source.len(), 1);

        let err = InMemorySource::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CmsError::Fixtures { .. }));
    }
}
