//! Generate static files

use anyhow::Result;
use std::path::PathBuf;

use crate::generator::Generator;
use crate::helpers::post_path;
use crate::Site;

/// What a generation run wrote
#[derive(Debug, Default)]
pub struct Report {
    pub files: Vec<PathBuf>,
    /// Posts listed for pre-rendering that no longer exist
    pub skipped: Vec<String>,
}

/// Render the listing page and the top posts into the public directory
pub async fn run(site: &Site) -> Result<Report> {
    let start = std::time::Instant::now();
    let generator = Generator::new(site)?;
    let mut report = Report::default();

    let index = generator.render_index().await?;
    report.files.push(generator.write_page("/", &index)?);

    let slugs = generator.static_slugs().await?;
    tracing::info!("Pre-rendering {} posts", slugs.len());

    for slug in slugs {
        match generator.render_post(&slug).await? {
            Some(html) => {
                report
                    .files
                    .push(generator.write_page(&post_path(&slug), &html)?);
            }
            None => {
                tracing::warn!("Post {:?} disappeared before it could be rendered", slug);
                report.skipped.push(slug);
            }
        }
    }

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} files in {:.2}s",
        report.files.len(),
        duration.as_secs_f64()
    );

    Ok(report)
}
