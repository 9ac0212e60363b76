//! HTTP server: listing, post pages and the pagination endpoint
//!
//! Pages go through [`PageCache`]: the listing and the top posts are rendered
//! at startup, other posts on their first request. Once a page is older than
//! the revalidation interval it is still served while a background task
//! renders a new copy.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{any, get},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::cache::{Lookup, PageCache};
use crate::generator::Generator;
use crate::helpers::post_path;
use crate::templates::LOAD_MORE_SCRIPT;
use crate::Site;

/// Response header carrying the total number of pages
pub const TOTAL_PAGES_HEADER: &str = "x-total-pages";

/// Server state
pub struct AppState {
    generator: Generator,
    cache: PageCache,
}

/// A cacheable page
#[derive(Debug, Clone)]
enum Route {
    Index,
    Post(String),
}

impl Route {
    fn key(&self) -> String {
        match self {
            Route::Index => "/".to_string(),
            Route::Post(slug) => post_path(slug),
        }
    }
}

impl AppState {
    pub fn new(site: &Site) -> Result<Self> {
        Ok(Self {
            generator: Generator::new(site)?,
            cache: PageCache::new(site.config.revalidate(), site.config.cache_limit()?),
        })
    }

    fn site(&self) -> &Site {
        self.generator.site()
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    /// Render the listing and the top posts into the cache
    pub async fn warm(&self) -> Result<usize> {
        let mut rendered = 0;

        let index = self.generator.render_index().await?;
        self.cache.insert(&Route::Index.key(), index);
        rendered += 1;

        for slug in self.generator.static_slugs().await? {
            if let Some(html) = self.generator.render_post(&slug).await? {
                self.cache.insert(&Route::Post(slug).key(), html);
                rendered += 1;
            }
        }

        tracing::info!("Pre-rendered {} pages", rendered);
        Ok(rendered)
    }

    async fn render(&self, route: &Route) -> Result<Option<String>> {
        match route {
            Route::Index => Ok(Some(self.generator.render_index().await?)),
            Route::Post(slug) => self.generator.render_post(slug).await,
        }
    }

    /// Generic failure page for upstream errors
    fn failure(&self, key: &str, error: anyhow::Error) -> Response {
        tracing::error!("Failed to render {}: {:#}", key, error);
        let html = self
            .generator
            .render_error(500, "Não foi possível carregar o conteúdo.");
        (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response()
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.site().static_dir.clone();

    let api = Router::new()
        .route("/posts", any(posts_first_page))
        .route("/posts/:page", any(posts_page));

    Router::new()
        .route("/", get(index))
        .route("/post/:slug", get(post_detail))
        .route("/assets/load-more.js", get(load_more_script))
        .nest("/api", api)
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the server
pub async fn start(site: &Site, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(site)?);

    if let Err(e) = state.warm().await {
        tracing::warn!("Pre-rendering failed, pages will render on demand: {:#}", e);
    }

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    serve_cached(state, Route::Index).await
}

async fn post_detail(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    serve_cached(state, Route::Post(slug)).await
}

async fn serve_cached(state: Arc<AppState>, route: Route) -> Response {
    let key = route.key();

    match state.cache.lookup(&key) {
        Lookup::Fresh(html) => Html(html).into_response(),
        Lookup::Stale(html) => {
            spawn_regeneration(Arc::clone(&state), route);
            Html(html).into_response()
        }
        Lookup::Missing => match state.render(&route).await {
            Ok(Some(html)) => {
                state.cache.insert(&key, html.clone());
                Html(html).into_response()
            }
            Ok(None) => Redirect::temporary("/").into_response(),
            Err(e) => state.failure(&key, e),
        },
    }
}

/// Re-render a stale page in the background, once per key at a time
fn spawn_regeneration(state: Arc<AppState>, route: Route) {
    let Some(claim) = Regeneration::claim(state, route.key()) else {
        return;
    };

    tokio::spawn(async move {
        let (state, key) = (&claim.state, &claim.key);
        match state.render(&route).await {
            Ok(Some(html)) => {
                state.cache.insert(key, html);
                tracing::info!("Regenerated {}", key);
            }
            Ok(None) => {
                state.cache.remove(key);
                tracing::info!("{} no longer exists, evicted", key);
            }
            Err(e) => {
                tracing::error!("Failed to regenerate {}: {:#}", key, e);
            }
        }
    });
}

/// A held regeneration claim; released on drop, including when the task panics
struct Regeneration {
    state: Arc<AppState>,
    key: String,
}

impl Regeneration {
    fn claim(state: Arc<AppState>, key: String) -> Option<Self> {
        if state.cache.try_claim(&key) {
            Some(Self { state, key })
        } else {
            None
        }
    }
}

impl Drop for Regeneration {
    fn drop(&mut self) {
        self.state.cache.release(&self.key);
    }
}

async fn posts_first_page(State(state): State<Arc<AppState>>, method: Method) -> Response {
    serve_posts(&state, &method, None).await
}

async fn posts_page(
    State(state): State<Arc<AppState>>,
    method: Method,
    Path(page): Path<String>,
) -> Response {
    serve_posts(&state, &method, Some(&page)).await
}

/// JSON page of post summaries
async fn serve_posts(state: &AppState, method: &Method, page: Option<&str>) -> Response {
    if method != Method::GET {
        return method_not_allowed();
    }

    let page = match parse_page(page) {
        Some(page) => page,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                "Page must be a positive integer",
            )
                .into_response()
        }
    };

    let site = state.site();
    match site.posts.query_posts(page, site.config.page_size).await {
        Ok(result) => {
            let mut response = Json(result.results).into_response();
            response
                .headers_mut()
                .insert(TOTAL_PAGES_HEADER, HeaderValue::from(result.total_pages));
            response
        }
        Err(e) => {
            tracing::error!("Failed to load page {} of posts: {}", page, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load posts").into_response()
        }
    }
}

/// Page number from the path; absent means the first page
fn parse_page(raw: Option<&str>) -> Option<u32> {
    match raw {
        None => Some(1),
        Some(raw) => raw.trim().parse::<u32>().ok().filter(|page| *page >= 1),
    }
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET")],
        "Method not allowed",
    )
        .into_response()
}

async fn load_more_script() -> Response {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        LOAD_MORE_SCRIPT,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{Document, InMemorySource};
    use crate::config::SiteConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;

    fn documents(count: usize) -> Vec<Document> {
        (1..=count)
            .map(|n| Document {
                id: format!("id-{n}"),
                uid: Some(format!("post-{n}")),
                doc_type: "posts".to_string(),
                first_publication_date: Some("2021-03-15T19:25:28+0000".to_string()),
                data: json!({
                    "title": format!("Post {n}"),
                    "subtitle": "Sub",
                    "author": "Ana",
                    "banner": {"url": "https://img/b.png"},
                    "content": [{"heading": "Intro", "body": [{"text": "Olá"}]}]
                }),
            })
            .collect()
    }

    fn state_with(docs: Vec<Document>, revalidate_secs: u64) -> Arc<AppState> {
        let mut config = SiteConfig::default();
        config.revalidate_secs = revalidate_secs;
        let site = Site::with_source(".", config, Arc::new(InMemorySource::new(docs))).unwrap();
        Arc::new(AppState::new(&site).unwrap())
    }

    async fn send(state: Arc<AppState>, method: Method, uri: &str) -> Response {
        router(state)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_posts_endpoint_returns_page() {
        let response = send(state_with(documents(23), 1800), Method::GET, "/api/posts/1").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[TOTAL_PAGES_HEADER], "3");
        let posts: Vec<serde_json::Value> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(posts.len(), 10);
        assert_eq!(
            posts[0],
            json!({
                "uid": "post-1",
                "first_publication_date": "15 mar 2021",
                "data": {"title": "Post 1", "subtitle": "Sub", "author": "Ana"}
            })
        );
    }

    #[tokio::test]
    async fn test_posts_endpoint_last_page_is_short() {
        let response = send(state_with(documents(23), 1800), Method::GET, "/api/posts/3").await;
        let posts: Vec<serde_json::Value> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[2]["uid"], "post-23");
    }

    #[tokio::test]
    async fn test_posts_endpoint_defaults_to_first_page() {
        let response = send(state_with(documents(12), 1800), Method::GET, "/api/posts").await;
        assert_eq!(response.status(), StatusCode::OK);
        let posts: Vec<serde_json::Value> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(posts.len(), 10);
        assert_eq!(posts[0]["uid"], "post-1");
    }

    #[tokio::test]
    async fn test_posts_endpoint_rejects_other_methods() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            let response = send(state_with(documents(1), 1800), method, "/api/posts/1").await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.headers()[header::ALLOW], "GET");
            assert_eq!(body_string(response).await, "Method not allowed");
        }

        let response = send(state_with(documents(1), 1800), Method::POST, "/api/posts").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_posts_endpoint_rejects_bad_page() {
        for uri in ["/api/posts/0", "/api/posts/abc", "/api/posts/-1"] {
            let response = send(state_with(documents(1), 1800), Method::GET, uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_index_renders_first_page() {
        let response = send(state_with(documents(23), 1800), Method::GET, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("Post 10"));
        assert!(!html.contains("Post 11"));
        assert!(html.contains(r#"data-next-page="2""#));
    }

    #[tokio::test]
    async fn test_post_detail_renders_and_caches() {
        let state = state_with(documents(2), 1800);
        let response = send(Arc::clone(&state), Method::GET, "/post/post-2").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("Post 2"));
        assert!(matches!(
            state.cache().lookup("/post/post-2"),
            Lookup::Fresh(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_post_redirects_home() {
        let state = state_with(documents(2), 1800);
        let response = send(Arc::clone(&state), Method::GET, "/post/nope").await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert_eq!(state.cache().lookup("/post/nope"), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_stale_page_is_served_then_regenerated() {
        let state = state_with(documents(1), 0);
        state.cache().insert("/post/post-1", "old copy".to_string());

        let response = send(Arc::clone(&state), Method::GET, "/post/post-1").await;
        assert_eq!(body_string(response).await, "old copy");

        for _ in 0..100 {
            if let Lookup::Stale(html) = state.cache().lookup("/post/post-1") {
                if html != "old copy" && !state.cache().is_regenerating("/post/post-1") {
                    assert!(html.contains("Post 1"));
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("page was not regenerated");
    }

    #[tokio::test]
    async fn test_regeneration_evicts_deleted_post() {
        let state = state_with(documents(1), 0);
        state.cache().insert("/post/gone", "old copy".to_string());

        let response = send(Arc::clone(&state), Method::GET, "/post/gone").await;
        assert_eq!(body_string(response).await, "old copy");

        for _ in 0..100 {
            if state.cache().lookup("/post/gone") == Lookup::Missing {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("deleted post was not evicted");
    }

    #[tokio::test]
    async fn test_claim_is_released_when_regeneration_panics() {
        let state = state_with(vec![], 1800);
        let claim = Regeneration::claim(Arc::clone(&state), "/post/a".to_string()).unwrap();
        assert!(Regeneration::claim(Arc::clone(&state), "/post/a".to_string()).is_none());

        let handle = tokio::spawn(async move {
            let _claim = claim;
            panic!("render failed");
        });

        assert!(handle.await.unwrap_err().is_panic());
        assert!(!state.cache().is_regenerating("/post/a"));
        assert!(Regeneration::claim(Arc::clone(&state), "/post/a".to_string()).is_some());
    }

    #[tokio::test]
    async fn test_warm_prerenders_listing_and_static_posts() {
        let state = state_with(documents(12), 1800);
        let rendered = state.warm().await.unwrap();

        assert_eq!(rendered, 11);
        assert!(matches!(state.cache().lookup("/"), Lookup::Fresh(_)));
        assert!(matches!(state.cache().lookup("/post/post-10"), Lookup::Fresh(_)));
        assert_eq!(state.cache().lookup("/post/post-11"), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_load_more_script_is_served() {
        let response = send(state_with(vec![], 1800), Method::GET, "/assets/load-more.js").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("/api/posts/"));
    }

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(None), Some(1));
        assert_eq!(parse_page(Some("4")), Some(4));
        assert_eq!(parse_page(Some("0")), None);
        assert_eq!(parse_page(Some("x")), None);
    }
}
