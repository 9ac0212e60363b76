//! Built-in templates using the Tera template engine
//!
//! All templates are embedded directly in the binary. Autoescaping stays on
//! for `.html` templates since titles and body text come from the CMS; paths
//! we build ourselves are already percent-encoded and marked `safe`.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{PostDetail, PostPage, PostSummary};
use crate::helpers::post_path;
use crate::listing::PageCursor;

/// Browser side of the "load more" button on the listing page
pub const LOAD_MORE_SCRIPT: &str = include_str!("site/load-more.js");

/// Template renderer with the embedded site theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("error.html", include_str!("site/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/post_summary.html",
                include_str!("site/partials/post_summary.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Listing page seeded with its first page of posts
    pub fn render_index(&self, site: &SiteData, first: &PostPage) -> Result<String> {
        let posts: Vec<SummaryView> = first.results.iter().map(SummaryView::new).collect();
        let cursor = PageCursor::new(first.page, first.total_pages);

        let mut context = Context::new();
        context.insert("site", site);
        context.insert("posts", &posts);
        context.insert(
            "pagination",
            &PaginationData {
                page: cursor.page,
                total_pages: cursor.total_pages,
                next_page: cursor.next_page(),
            },
        );
        self.render("index.html", &context)
    }

    /// Post detail page
    pub fn render_post(&self, site: &SiteData, post: &PostDetail) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("post", post);
        self.render("post.html", &context)
    }

    /// Generic failure page
    pub fn render_error(&self, site: &SiteData, status: u16, message: &str) -> Result<String> {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("status", &status);
        context.insert("message", message);
        self.render("error.html", &context)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            language: config.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub summary: PostSummary,
    pub path: String,
}

impl SummaryView {
    fn new(summary: &PostSummary) -> Self {
        Self {
            path: post_path(summary.uid.as_deref().unwrap_or_default()),
            summary: summary.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    pub page: u32,
    pub total_pages: u32,
    pub next_page: Option<u32>,
}
