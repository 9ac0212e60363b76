//! Generator module - renders pages from CMS content using the built-in templates

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::helpers::output_file;
use crate::templates::{SiteData, TemplateRenderer};
use crate::Site;

/// Renders the listing and post pages
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
    site_data: SiteData,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let site_data = SiteData::from_config(&site.config);

        Ok(Self {
            site: site.clone(),
            renderer,
            site_data,
        })
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Render the listing page with the first page of posts
    pub async fn render_index(&self) -> Result<String> {
        let first = self
            .site
            .posts
            .query_posts(1, self.site.config.page_size)
            .await?;
        tracing::debug!(
            "Rendering listing with {} posts ({} pages)",
            first.results.len(),
            first.total_pages
        );
        self.renderer.render_index(&self.site_data, &first)
    }

    /// Render a post page; `Ok(None)` when the slug does not exist
    pub async fn render_post(&self, slug: &str) -> Result<Option<String>> {
        match self.site.posts.get_post_by_slug(slug).await? {
            Some(post) => Ok(Some(self.renderer.render_post(&self.site_data, &post)?)),
            None => Ok(None),
        }
    }

    /// Render the generic failure page, falling back to plain text
    pub fn render_error(&self, status: u16, message: &str) -> String {
        self.renderer
            .render_error(&self.site_data, status, message)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to render error page: {}", e);
                format!("{} {}", status, message)
            })
    }

    /// Slugs rendered ahead of time
    pub async fn static_slugs(&self) -> Result<Vec<String>> {
        Ok(self
            .site
            .posts
            .static_slugs(self.site.config.static_paths)
            .await?)
    }

    /// Write a rendered route below the public directory
    pub fn write_page(&self, route: &str, html: &str) -> Result<PathBuf> {
        let output_path = output_file(&self.site.public_dir, route);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, html)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{Document, InMemorySource};
    use crate::config::SiteConfig;
    use serde_json::json;
    use std::sync::Arc;

    fn site(dir: &std::path::Path) -> Site {
        let docs = vec![Document {
            id: "1".to_string(),
            uid: Some("hello".to_string()),
            doc_type: "posts".to_string(),
            first_publication_date: Some("2021-03-15T19:25:28+0000".to_string()),
            data: json!({
                "title": "Hello",
                "subtitle": "World",
                "author": "Ana",
                "banner": {"url": "https://img/b.png"},
                "content": [{"heading": "Intro", "body": [{"text": "Olá"}]}]
            }),
        }];
        Site::with_source(
            dir,
            SiteConfig::default(),
            Arc::new(InMemorySource::new(docs)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_render_index_and_post() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();

        let index = generator.render_index().await.unwrap();
        assert!(index.contains("Hello"));
        assert!(index.contains("15 mar 2021"));

        let post = generator.render_post("hello").await.unwrap().unwrap();
        assert!(post.contains("<h2>Intro</h2>"));

        assert!(generator.render_post("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_page() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();

        let path = generator.write_page("/post/hello", "<html></html>").unwrap();
        assert_eq!(
            path,
            dir.path().join("public/post/hello/index.html")
        );
        assert_eq!(fs::read_to_string(path).unwrap(), "<html></html>");
    }
}
