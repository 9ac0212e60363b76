//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::helpers::{DateFormatter, Locale};

/// Environment variable overriding `cms.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable overriding `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // Date format (Moment.js tokens)
    pub date_format: String,

    // Pagination
    pub page_size: u32,

    // Detail pages
    /// How many post pages are rendered ahead of time
    pub static_paths: u32,
    /// Seconds a rendered page is served before it is regenerated
    pub revalidate_secs: u64,
    /// Rendered pages kept in memory by the server
    pub cache_limit: usize,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Content repository
    #[serde(default)]
    pub cms: CmsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-br".to_string(),
            timezone: "UTC".to_string(),

            date_format: "DD MMM YYYY".to_string(),

            page_size: 10,

            static_paths: 10,
            revalidate_secs: 60 * 30,
            cache_limit: 1000,

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            cms: CmsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            tracing::debug!("CMS endpoint overridden by {}", ENDPOINT_ENV);
            self.cms.endpoint = Some(endpoint);
        }
        if let Some(token) = lookup(ACCESS_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.cms.access_token = Some(token);
        }
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > crate::cms::MAX_PAGE_SIZE {
            anyhow::bail!(
                "page_size must be between 1 and {}, got {}",
                crate::cms::MAX_PAGE_SIZE,
                self.page_size
            );
        }
        if self.static_paths > crate::cms::MAX_PAGE_SIZE {
            anyhow::bail!(
                "static_paths must be at most {}, got {}",
                crate::cms::MAX_PAGE_SIZE,
                self.static_paths
            );
        }
        self.cache_limit()?;
        self.locale()?;
        self.tz()?;
        Ok(())
    }

    pub fn locale(&self) -> Result<Locale> {
        Locale::from_tag(&self.language)
            .ok_or_else(|| anyhow::anyhow!("Unsupported language: {}", self.language))
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone {:?}: {}", self.timezone, e))
    }

    /// Date formatter for the configured pattern, language and zone
    pub fn date_formatter(&self) -> Result<DateFormatter> {
        Ok(DateFormatter::new(
            &self.date_format,
            self.locale()?,
            self.tz()?,
        ))
    }

    pub fn revalidate(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs)
    }

    pub fn cache_limit(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.cache_limit)
            .ok_or_else(|| anyhow::anyhow!("cache_limit must be at least 1"))
    }
}

/// Content repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API endpoint, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
    /// Custom type holding blog posts
    pub document_type: String,
    pub timeout_secs: u64,
    /// Seconds the repository's master ref is reused between queries
    pub ref_ttl_secs: u64,
    /// JSON file of documents served instead of a remote repository
    pub fixtures: Option<PathBuf>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_token: None,
            document_type: "posts".to_string(),
            timeout_secs: 10,
            ref_ttl_secs: crate::cms::MASTER_REF_TTL.as_secs(),
            fixtures: None,
        }
    }
}

impl CmsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn ref_ttl(&self) -> Duration {
        Duration::from_secs(self.ref_ttl_secs)
    }
}
