//! spacetraveling: a blog front-end over a headless CMS
//!
//! Posts live in a Prismic repository. This crate renders the paginated
//! listing and the post pages from it, either ahead of time (`generate`) or on
//! demand behind a cache that regenerates pages on a fixed interval
//! (`server`), and serves the JSON endpoint the listing uses to load more
//! posts.

pub mod cache;
pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod listing;
pub mod server;
pub mod templates;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cms::{ContentSource, InMemorySource, PrismicClient};
use content::PostStore;

/// The main application
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Directory of static files served as-is
    pub static_dir: PathBuf,
    /// Post queries over the configured content source
    pub posts: PostStore,
}

impl Site {
    /// Create a site from a directory, reading `_config.yml` and the
    /// `PRISMIC_*` environment variables
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        let source = Self::connect(&config, &base_dir)?;
        Self::with_source(base_dir, config, source)
    }

    /// Create a site over an already constructed content source
    pub fn with_source<P: AsRef<Path>>(
        base_dir: P,
        config: config::SiteConfig,
        source: Arc<dyn ContentSource>,
    ) -> Result<Self> {
        config.validate()?;

        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let posts = PostStore::new(source, &config.cms.document_type, config.date_formatter()?);

        Ok(Self {
            config,
            base_dir,
            public_dir,
            static_dir,
            posts,
        })
    }

    /// Build the content source named by the configuration
    fn connect(config: &config::SiteConfig, base_dir: &Path) -> Result<Arc<dyn ContentSource>> {
        if let Some(fixtures) = &config.cms.fixtures {
            let path = base_dir.join(fixtures);
            tracing::info!("Serving content from fixtures {:?}", path);
            return Ok(Arc::new(InMemorySource::from_file(&path)?));
        }

        let endpoint = config.cms.endpoint.as_deref().with_context(|| {
            format!(
                "No CMS endpoint configured; set cms.endpoint in _config.yml or {}",
                config::ENDPOINT_ENV
            )
        })?;
        tracing::debug!("Using Prismic repository at {}", endpoint);

        Ok(Arc::new(
            PrismicClient::new(
                endpoint,
                config.cms.access_token.clone(),
                config.cms.timeout(),
            )?
            .with_ref_ttl(config.cms.ref_ttl()),
        ))
    }

    /// Render the static site into the public directory
    pub async fn generate(&self) -> Result<commands::generate::Report> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
