//! Prismic REST API v2 client

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use url::Url;

use super::{
    predicate::{to_query_param, Predicate},
    CmsError, ContentSource, Document, Query, Result, SearchResponse,
};

/// API root document; only the refs matter to us
#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// How long a master ref is reused before the API root is read again
pub const MASTER_REF_TTL: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct CachedRef {
    reference: String,
    fetched_at: Instant,
}

/// HTTP client for a single Prismic repository
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    ref_ttl: Duration,
    master: Arc<RwLock<Option<CachedRef>>>,
}

impl PrismicClient {
    /// Create a client for an API endpoint such as
    /// `https://my-repo.cdn.prismic.io/api/v2`
    pub fn new(endpoint: &str, access_token: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| CmsError::InvalidQuery {
            message: format!("invalid CMS endpoint {:?}: {}", endpoint, e),
        })?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: access_token.filter(|t| !t.is_empty()),
            ref_ttl: MASTER_REF_TTL,
            master: Arc::new(RwLock::new(None)),
        })
    }

    /// Reuse a fetched master ref for `ttl`; zero reads the API root on every query
    pub fn with_ref_ttl(mut self, ttl: Duration) -> Self {
        self.ref_ttl = ttl;
        self
    }

    fn cached_ref(&self) -> Option<String> {
        self.master
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ref_ttl)
            .map(|cached| cached.reference.clone())
    }

    fn store_ref(&self, reference: Option<&str>) {
        *self.master.write().unwrap_or_else(PoisonError::into_inner) =
            reference.map(|reference| CachedRef {
                reference: reference.to_string(),
                fetched_at: Instant::now(),
            });
    }

    fn search_url(&self) -> String {
        format!(
            "{}/documents/search",
            self.endpoint.as_str().trim_end_matches('/')
        )
    }

    /// Look up the ref of the currently published content
    async fn master_ref(&self) -> Result<String> {
        if let Some(reference) = self.cached_ref() {
            return Ok(reference);
        }

        let mut request = self.http.get(self.endpoint.clone());
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token)]);
        }

        let root: ApiRoot = decode(request.send().await?).await?;
        let reference = root
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(CmsError::MissingMasterRef)?;

        tracing::debug!("Master ref is {}", reference);
        self.store_ref(Some(&reference));
        Ok(reference)
    }

    async fn search(&self, params: Vec<(&'static str, String)>) -> Result<SearchResponse> {
        let reference = self.master_ref().await?;

        let mut request = self
            .http
            .get(self.search_url())
            .query(&[("ref", reference)])
            .query(&params);
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token)]);
        }

        tracing::debug!("CMS search {:?}", params);
        let result = decode(request.send().await?).await;
        if let Err(CmsError::Status { .. }) = &result {
            // the ref may have been retired; read it again next time
            self.store_ref(None);
        }
        result
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(&self, query: &Query) -> Result<SearchResponse> {
        query.validate()?;

        let mut params = vec![
            ("q", to_query_param(&query.predicates)),
            ("pageSize", query.page_size.to_string()),
            ("page", query.page.to_string()),
        ];
        if !query.fetch.is_empty() {
            params.push(("fetch", query.fetch.join(",")));
        }

        self.search(params).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<Document>> {
        let params = vec![
            ("q", to_query_param(&[Predicate::uid(doc_type, uid)])),
            ("pageSize", "1".to_string()),
        ];
        let response = self.search(params).await?;
        Ok(response.results.into_iter().next())
    }
}

/// Turn a response into `T`, keeping the body of non-success statuses
async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(CmsError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
