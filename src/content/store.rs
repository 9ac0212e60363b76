//! Post queries over the injected content source

use std::sync::Arc;

use crate::cms::{self, ContentSource, Query};
use crate::helpers::DateFormatter;

use super::{PostDetail, PostSummary};

/// Fields fetched for listings
const SUMMARY_FIELDS: [&str; 3] = ["title", "subtitle", "author"];

/// One page of post summaries plus its pagination cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPage {
    pub results: Vec<PostSummary>,
    pub page: u32,
    /// Opaque next-page URL from the repository
    pub next_page: Option<String>,
    pub total_pages: u32,
}

/// Read-only post queries: listings, slug lookups and the pre-render list
#[derive(Clone)]
pub struct PostStore {
    source: Arc<dyn ContentSource>,
    document_type: String,
    dates: DateFormatter,
}

impl PostStore {
    pub fn new(source: Arc<dyn ContentSource>, document_type: &str, dates: DateFormatter) -> Self {
        Self {
            source,
            document_type: document_type.to_string(),
            dates,
        }
    }

    fn fields(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|name| format!("{}.{}", self.document_type, name))
            .collect()
    }

    /// Fetch page `page` (1-based) of post summaries
    pub async fn query_posts(&self, page: u32, page_size: u32) -> cms::Result<PostPage> {
        let query = Query::documents_of_type(&self.document_type)
            .fetch(self.fields(&SUMMARY_FIELDS))
            .page_size(page_size)
            .page(page);
        query.validate()?;

        let response = self.source.query(&query).await?;
        tracing::debug!(
            "Fetched page {}/{} with {} posts",
            response.page,
            response.total_pages,
            response.results.len()
        );

        let results = response
            .results
            .into_iter()
            .map(|doc| PostSummary::from_document(doc, &self.dates))
            .collect::<cms::Result<Vec<_>>>()?;

        Ok(PostPage {
            results,
            page: response.page,
            next_page: response.next_page,
            total_pages: response.total_pages,
        })
    }

    /// Fetch a full post; `Ok(None)` when no post has this slug
    pub async fn get_post_by_slug(&self, slug: &str) -> cms::Result<Option<PostDetail>> {
        match self.source.get_by_uid(&self.document_type, slug).await? {
            Some(doc) => Ok(Some(PostDetail::from_document(doc, &self.dates)?)),
            None => {
                tracing::debug!("No post with slug {:?}", slug);
                Ok(None)
            }
        }
    }

    /// Slugs of the first `limit` posts, rendered ahead of time
    pub async fn static_slugs(&self, limit: u32) -> cms::Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = Query::documents_of_type(&self.document_type)
            .fetch(self.fields(&["title"]))
            .page_size(limit)
            .page(1);
        let response = self.source.query(&query).await?;

        Ok(response
            .results
            .into_iter()
            .filter_map(|doc| doc.uid)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{CmsError, Document, InMemorySource};
    use serde_json::json;

    fn store(count: usize) -> PostStore {
        let docs = (1..=count)
            .map(|n| Document {
                id: format!("id-{n}"),
                uid: Some(format!("post-{n}")),
                doc_type: "posts".to_string(),
                first_publication_date: Some("2021-03-25T19:27:35+0000".to_string()),
                data: json!({
                    "title": format!("Post {n}"),
                    "subtitle": "Sub",
                    "author": "Ana",
                    "banner": {"url": "https://img/b.png"},
                    "content": [{"heading": "Intro", "body": [{"text": "Olá mundo"}]}]
                }),
            })
            .collect();
        PostStore::new(
            Arc::new(InMemorySource::new(docs)),
            "posts",
            DateFormatter::default(),
        )
    }

    #[tokio::test]
    async fn test_query_posts_first_page() {
        let page = store(23).query_posts(1, 10).await.unwrap();

        assert_eq!(page.results.len(), 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert!(page.next_page.is_some());
        assert_eq!(
            page.results[0].first_publication_date.as_deref(),
            Some("25 mar 2021")
        );
    }

    #[tokio::test]
    async fn test_query_posts_last_page_is_short() {
        let page = store(23).query_posts(3, 10).await.unwrap();
        assert_eq!(page.results.len(), 3);
        assert!(page.next_page.is_none());
    }

    #[tokio::test]
    async fn test_query_posts_rejects_page_zero() {
        let err = store(1).query_posts(0, 10).await.unwrap_err();
        assert!(matches!(err, CmsError::InvalidQuery { .. }));
    }

    #[tokio::test]
    async fn test_get_post_by_slug() {
        let store = store(2);
        let post = store.get_post_by_slug("post-2").await.unwrap().unwrap();
        assert_eq!(post.data.title, "Post 2");
        assert_eq!(post.data.content[0].body[0].text, "Olá mundo");
        assert_eq!(post.reading_minutes, 1);

        assert!(store.get_post_by_slug("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_static_slugs_are_bounded() {
        let store = store(15);
        let slugs = store.static_slugs(10).await.unwrap();
        assert_eq!(slugs.len(), 10);
        assert_eq!(slugs[0], "post-1");

        assert!(store.static_slugs(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cms_fields_do_not_fail_the_page() {
        let docs = vec![
            Document {
                id: "a".to_string(),
                uid: Some("completo".to_string()),
                doc_type: "posts".to_string(),
                first_publication_date: None,
                data: json!({"title": "Completo", "subtitle": "Sub", "author": "Ana"}),
            },
            Document {
                id: "b".to_string(),
                uid: Some("sem-subtitulo".to_string()),
                doc_type: "posts".to_string(),
                first_publication_date: None,
                data: json!({
                    "title": "Sem subtítulo",
                    "subtitle": null,
                    "author": "Ana",
                    "content": [{"heading": null, "body": [{"text": "Olá"}]}]
                }),
            },
        ];
        let store = PostStore::new(
            Arc::new(InMemorySource::new(docs)),
            "posts",
            DateFormatter::default(),
        );

        let page = store.query_posts(1, 10).await.unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[1].data.subtitle, "");

        let detail = store.get_post_by_slug("sem-subtitulo").await.unwrap().unwrap();
        assert_eq!(detail.data.content[0].heading, "");
    }
}
